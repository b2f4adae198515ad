#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Customer,
    Seller,
}

impl Speaker {
    pub fn tag(self) -> &'static str {
        match self {
            Speaker::Customer => "Cliente",
            Speaker::Seller => "Vendedor",
        }
    }
}

/// Append-only transcript of one chat session.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<(Speaker, String)>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn add_customer_message(&mut self, message: &str) {
        self.turns.push((Speaker::Customer, message.to_string()));
    }

    pub fn add_seller_message(&mut self, message: &str) {
        self.turns.push((Speaker::Seller, message.to_string()));
    }

    /// One `Tag: message` line per turn, in order.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|(speaker, message)| format!("{}: {}", speaker.tag(), message))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
