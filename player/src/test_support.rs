use crate::DisplayBridge;

/// A display fake that records everything the protocol surfaces.
#[derive(Default)]
pub struct RecordingDisplay {
    pub updates: Vec<String>,
    pub table_cards: Vec<String>,
    pub own_cards: Vec<String>,
    pub shown: bool,
    pub disposed: bool,
}

impl DisplayBridge for RecordingDisplay {
    fn update(&mut self, text: &str) {
        self.updates.push(text.to_owned());
    }

    fn show_table_card(&mut self, text: &str) {
        self.table_cards.push(text.to_owned());
    }

    fn show_own_card(&mut self, text: &str) {
        self.own_cards.push(text.to_owned());
    }

    fn show(&mut self) {
        self.shown = true;
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
