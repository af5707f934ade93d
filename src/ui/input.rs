use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::selection::Direction;

/// Which pane has keyboard focus. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Projects,
    #[default]
    Tasks,
    Details,
}

/// What a key press asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Project list
    ProjectStep(Direction),
    EnterTasks,

    // Task list movement
    Step(Direction),
    Extend(Direction),
    FocusParent,
    FocusDetails,

    // Structural shortcuts
    NewSibling,
    NewChild,
    Delete,
    Copy,
    Paste,
    ToggleComplete,
    ToggleCollapse,
    SelectAll,
    ToggleMultiMode,
    ExitMulti,

    // Detail pane
    LeaveDetails,
    /// Name typed into the focused draft
    ConfirmDraft(String),
}

/// Map a key to an action for the focused area.
///
/// Structural shortcuts only fire in the task list with no text input
/// focused; while typing, the only key handled here is Escape in the detail
/// pane.
pub fn map_key(area: Area, input_focused: bool, key: KeyEvent) -> Option<Action> {
    if matches!(key.code, KeyCode::Modifier(_)) {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    match area {
        Area::Projects => match key.code {
            KeyCode::Up => Some(Action::ProjectStep(Direction::Up)),
            KeyCode::Down => Some(Action::ProjectStep(Direction::Down)),
            KeyCode::Right | KeyCode::Enter => Some(Action::EnterTasks),
            _ => None,
        },
        Area::Details => match key.code {
            KeyCode::Esc => Some(Action::LeaveDetails),
            KeyCode::Left if !input_focused => Some(Action::LeaveDetails),
            _ => None,
        },
        Area::Tasks if input_focused => None,
        Area::Tasks => match key.code {
            KeyCode::Up if shift => Some(Action::Extend(Direction::Up)),
            KeyCode::Down if shift => Some(Action::Extend(Direction::Down)),
            KeyCode::Up => Some(Action::Step(Direction::Up)),
            KeyCode::Down => Some(Action::Step(Direction::Down)),
            KeyCode::Right if ctrl => Some(Action::ToggleCollapse),
            KeyCode::Right => Some(Action::FocusDetails),
            KeyCode::Left => Some(Action::FocusParent),
            KeyCode::Enter => Some(Action::NewSibling),
            KeyCode::Tab => Some(Action::NewChild),
            KeyCode::Delete | KeyCode::Backspace => Some(Action::Delete),
            KeyCode::Esc => Some(Action::ExitMulti),
            KeyCode::Char(' ') if ctrl => Some(Action::ToggleMultiMode),
            KeyCode::Char(' ') => Some(Action::ToggleComplete),
            KeyCode::Char(c) if ctrl => match c.to_ascii_lowercase() {
                'c' => Some(Action::Copy),
                'v' => Some(Action::Paste),
                'a' => Some(Action::SelectAll),
                _ => None,
            },
            _ => None,
        },
    }
}

// ---------------------------------------------------------------------------
// Key scripts
// ---------------------------------------------------------------------------

/// Error type for key script parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyScriptError {
    #[error("unknown key: {0}")]
    UnknownKey(String),
    #[error("unknown modifier in key: {0}")]
    UnknownModifier(String),
    #[error("unterminated quote in key script")]
    UnterminatedQuote,
}

/// One step of a replayed key script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Key(KeyEvent),
    /// Text typed into the focused input, submitted as a whole
    Text(String),
}

/// Parse a key script such as `down S-down C-c "New task" esc`.
///
/// Keys are separated by whitespace or commas. Modifiers prefix a key as
/// `C-` (control), `S-` (shift) or `A-` (alt). A double-quoted string types
/// text into the focused input.
pub fn parse_key_script(script: &str) -> Result<Vec<ScriptStep>, KeyScriptError> {
    let mut steps = Vec::new();
    let mut chars = script.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped) => text.push(escaped),
                        None => return Err(KeyScriptError::UnterminatedQuote),
                    },
                    Some(ch) => text.push(ch),
                    None => return Err(KeyScriptError::UnterminatedQuote),
                }
            }
            steps.push(ScriptStep::Text(text));
            continue;
        }
        let mut token = String::new();
        while let Some(&ch) = chars.peek() {
            if ch.is_whitespace() || ch == ',' || ch == '"' {
                break;
            }
            token.push(ch);
            chars.next();
        }
        steps.push(ScriptStep::Key(parse_key(&token)?));
    }
    Ok(steps)
}

/// Parse a single key token (`enter`, `S-up`, `C-c`, `x`)
pub fn parse_key(token: &str) -> Result<KeyEvent, KeyScriptError> {
    let mut modifiers = KeyModifiers::NONE;
    let mut rest = token;
    while rest.len() > 2 && rest.as_bytes()[1] == b'-' {
        let flag = match &rest[..1] {
            "C" | "c" => KeyModifiers::CONTROL,
            "S" | "s" => KeyModifiers::SHIFT,
            "A" | "a" | "M" | "m" => KeyModifiers::ALT,
            _ => return Err(KeyScriptError::UnknownModifier(token.to_string())),
        };
        modifiers |= flag;
        rest = &rest[2..];
    }

    let code = match rest.to_ascii_lowercase().as_str() {
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "enter" | "ret" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "esc" | "escape" => KeyCode::Esc,
        "space" | "spc" => KeyCode::Char(' '),
        "del" | "delete" => KeyCode::Delete,
        "bs" | "backspace" => KeyCode::Backspace,
        _ => {
            let mut it = rest.chars();
            match (it.next(), it.next()) {
                (Some(ch), None) => KeyCode::Char(ch),
                _ => return Err(KeyScriptError::UnknownKey(token.to_string())),
            }
        }
    };
    Ok(KeyEvent::new(code, modifiers))
}
