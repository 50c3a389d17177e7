use tracing::info;

/// The narrow observer the protocol notifies of state changes.
///
/// All methods are fire-and-forget; nothing a display returns ever feeds a
/// protocol decision. The state machines hold this trait rather than a
/// concrete view, so the core has no upward dependency on presentation.
pub trait DisplayBridge {
    /// Surface a line of status text.
    fn update(&mut self, text: &str);
    /// Show a card belonging to the table (or an opponent).
    fn show_table_card(&mut self, text: &str);
    /// Show a card the player just drew.
    fn show_own_card(&mut self, text: &str);
    /// Bring the view up.
    fn show(&mut self);
    /// Tear the view down.
    fn dispose(&mut self);
}

/// Terminal display: status goes to the log, nothing is retained.
pub struct TermDisplay {
    player_name: String,
}

impl TermDisplay {
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
        }
    }
}

impl DisplayBridge for TermDisplay {
    fn update(&mut self, text: &str) {
        info!(player = %self.player_name, "{}", text);
    }

    fn show_table_card(&mut self, text: &str) {
        info!(player = %self.player_name, "Table card: {}", text);
    }

    fn show_own_card(&mut self, text: &str) {
        info!(player = %self.player_name, "Your card: {}", text);
    }

    fn show(&mut self) {
        info!(player = %self.player_name, "Game view up");
    }

    fn dispose(&mut self) {
        info!(player = %self.player_name, "Search view closed");
    }
}
