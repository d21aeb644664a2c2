//! Stdin line parsing.

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    ToggleVoice,
    ToggleZoom,
    Quit,
    /// Pick clarify option `n` (1-based).
    Choose(usize),
    /// Free-text command for the backend.
    Command(String),
    Empty,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => Self::Empty,
            "/voice" => Self::ToggleVoice,
            "/zoom" => Self::ToggleZoom,
            "/quit" | "/exit" => Self::Quit,
            _ => match line.strip_prefix('/').and_then(|n| n.parse::<usize>().ok()) {
                Some(n) if n >= 1 => Self::Choose(n),
                _ => Self::Command(line.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slash_commands() {
        assert_eq!(Input::parse("/voice"), Input::ToggleVoice);
        assert_eq!(Input::parse(" /zoom \n"), Input::ToggleZoom);
        assert_eq!(Input::parse("/quit"), Input::Quit);
        assert_eq!(Input::parse("/2"), Input::Choose(2));
        assert_eq!(Input::parse("   "), Input::Empty);
    }

    #[test]
    fn everything_else_is_a_command() {
        assert_eq!(
            Input::parse("Disrupt WH1 to WH4"),
            Input::Command("Disrupt WH1 to WH4".into())
        );
        assert_eq!(Input::parse("/0"), Input::Command("/0".into()));
        assert_eq!(Input::parse("/reset"), Input::Command("/reset".into()));
    }
}
