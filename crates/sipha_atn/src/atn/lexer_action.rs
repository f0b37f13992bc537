use std::fmt;

/// Side effect executed when a lexer rule matches.
///
/// Records are compared structurally so every occurrence of `skip` or
/// `pushMode(STRING)` in a grammar shares one action-table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LexerAction {
    Skip,
    More,
    PopMode,
    Mode(i32),
    PushMode(i32),
    Type(i32),
    Channel(i32),
    Custom {
        rule_index: usize,
        action_index: usize,
    },
}

impl LexerAction {
    /// Custom actions may inspect the input position, so the runtime must
    /// run them where they occur rather than at the end of the token.
    #[must_use]
    pub const fn is_position_dependent(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

impl fmt::Display for LexerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::More => f.write_str("more"),
            Self::PopMode => f.write_str("popMode"),
            Self::Mode(mode) => write!(f, "mode({mode})"),
            Self::PushMode(mode) => write!(f, "pushMode({mode})"),
            Self::Type(ttype) => write!(f, "type({ttype})"),
            Self::Channel(channel) => write!(f, "channel({channel})"),
            Self::Custom {
                rule_index,
                action_index,
            } => write!(f, "custom({rule_index}, {action_index})"),
        }
    }
}
