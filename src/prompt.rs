use reedline::{Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};
use std::borrow::Cow;

/// Renders `mongosql [<db>]> ` per the REPL contract, with no database name
/// segment shown until one has been selected.
pub struct DbPrompt {
    db_name: Option<String>,
}

impl DbPrompt {
    pub fn new(db_name: Option<String>) -> Self {
        Self { db_name }
    }

    pub fn update_database(&mut self, new_db_name: &str) {
        self.db_name = Some(new_db_name.to_string());
    }
}

impl Prompt for DbPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        match &self.db_name {
            Some(db) => Cow::Owned(format!("mongosql [{db}]> ")),
            None => Cow::Borrowed("mongosql> "),
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => Cow::Borrowed(""),
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                reedline::PromptViMode::Insert => Cow::Borrowed("[INS] "),
                reedline::PromptViMode::Normal => Cow::Borrowed("[NOR] "),
            },
            PromptEditMode::Custom(_) => Cow::Borrowed(""),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("    -> ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let _prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "?",
        };
        match history_search.term.as_str() {
            "" => Cow::Borrowed("(reverse-i-search): "),
            _ => Cow::Owned(format!("(reverse-i-search '{}'): ", history_search.term)),
        }
    }
}
