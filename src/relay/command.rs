use std::fmt;

/// One of the four relay outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayChannel {
    One,
    Two,
    Three,
    Four,
}

impl RelayChannel {
    pub const ALL: [RelayChannel; 4] = [
        RelayChannel::One,
        RelayChannel::Two,
        RelayChannel::Three,
        RelayChannel::Four,
    ];

    /// Zero-based position in the relay bank.
    pub fn index(self) -> usize {
        match self {
            RelayChannel::One => 0,
            RelayChannel::Two => 1,
            RelayChannel::Three => 2,
            RelayChannel::Four => 3,
        }
    }

    /// One-based number as used in the command vocabulary.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl fmt::Display for RelayChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relay {}", self.number())
    }
}

/// Output level. High energizes the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayLevel {
    High,
    Low,
}

impl fmt::Display for RelayLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayLevel::High => write!(f, "ON"),
            RelayLevel::Low => write!(f, "OFF"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelayCommand {
    pub channel: RelayChannel,
    pub level: RelayLevel,
}

const fn cmd(channel: RelayChannel, level: RelayLevel) -> RelayCommand {
    RelayCommand { channel, level }
}

const VOCABULARY: [(&str, RelayCommand); 8] = [
    ("RELAY1_ON", cmd(RelayChannel::One, RelayLevel::High)),
    ("RELAY1_OFF", cmd(RelayChannel::One, RelayLevel::Low)),
    ("RELAY2_ON", cmd(RelayChannel::Two, RelayLevel::High)),
    ("RELAY2_OFF", cmd(RelayChannel::Two, RelayLevel::Low)),
    ("RELAY3_ON", cmd(RelayChannel::Three, RelayLevel::High)),
    ("RELAY3_OFF", cmd(RelayChannel::Three, RelayLevel::Low)),
    ("RELAY4_ON", cmd(RelayChannel::Four, RelayLevel::High)),
    ("RELAY4_OFF", cmd(RelayChannel::Four, RelayLevel::Low)),
];

impl RelayCommand {
    /// Exact, case-sensitive, whole-string match against the eight command
    /// literals. Anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        VOCABULARY
            .iter()
            .find(|(literal, _)| *literal == text)
            .map(|(_, command)| *command)
    }

    pub fn as_str(&self) -> &'static str {
        VOCABULARY
            .iter()
            .find(|(_, command)| command == self)
            .map(|(literal, _)| *literal)
            .unwrap_or_default()
    }

    pub fn all() -> impl Iterator<Item = RelayCommand> {
        VOCABULARY.iter().map(|(_, command)| *command)
    }
}

impl fmt::Display for RelayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
