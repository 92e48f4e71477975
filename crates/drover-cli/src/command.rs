//! Translates parsed arguments into wire commands.

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use drover_protocol::{
    Action, Command, ImageFormat, MouseButton, ScrollDirection, Viewport, WaitState, WaitUntil,
};

use crate::cli::{
    CliCommand, ImageFormatArg, MouseButtonArg, ScrollDirectionArg, TabAction, WaitStateArg,
    WaitUntilArg, WindowAction,
};
use crate::errors::AppError;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Builds a correlation id unique within this process.
pub(crate) fn next_request_id() -> String {
    let sequence = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("drover-{}-{sequence}", process::id())
}

/// Wraps an action in a command with a fresh correlation id.
pub(crate) fn command_for(action: Action) -> Command {
    Command {
        id: next_request_id(),
        action,
    }
}

/// Maps a subcommand to its wire action. `Sessions` is answered locally and
/// yields `None`.
pub(crate) fn action_for(command: CliCommand) -> Result<Option<Action>, AppError> {
    let action = match command {
        CliCommand::Navigate { url, wait_until } => Action::Navigate {
            url,
            wait_until: wait_until.map(wait_until_for),
        },
        CliCommand::Click {
            selector,
            button,
            click_count,
            delay,
        } => Action::Click {
            selector,
            button: button.map(button_for),
            click_count,
            delay,
        },
        CliCommand::Type {
            selector,
            text,
            delay,
            clear,
        } => Action::Type {
            selector,
            text,
            delay,
            clear: clear.then_some(true),
        },
        CliCommand::Press { key, selector } => Action::Press { key, selector },
        CliCommand::Screenshot {
            path,
            full_page,
            selector,
            format,
            quality,
        } => Action::Screenshot {
            path,
            full_page: full_page.then_some(true),
            selector,
            format: format.map(format_for),
            quality,
        },
        CliCommand::Snapshot => Action::Snapshot,
        CliCommand::Evaluate { script, args } => Action::Evaluate {
            script,
            args: parse_script_args(&args)?,
        },
        CliCommand::Wait {
            selector,
            text,
            timeout,
            state,
        } => Action::Wait {
            selector,
            text,
            timeout,
            state: state.map(state_for),
        },
        CliCommand::Scroll {
            selector,
            x,
            y,
            direction,
            amount,
        } => Action::Scroll {
            selector,
            x,
            y,
            direction: direction.map(direction_for),
            amount,
        },
        CliCommand::Select { selector, values } => Action::Select { selector, values },
        CliCommand::Hover { selector } => Action::Hover { selector },
        CliCommand::Content { selector } => Action::Content { selector },
        CliCommand::Close => Action::Close,
        CliCommand::Tab { action } => match action {
            TabAction::New => Action::TabNew,
            TabAction::List => Action::TabList,
            TabAction::Switch { index } => Action::TabSwitch { index },
            TabAction::Close { index } => Action::TabClose { index },
        },
        CliCommand::Window {
            action: WindowAction::New { viewport },
        } => Action::WindowNew {
            viewport: match (viewport.width, viewport.height) {
                (Some(width), Some(height)) => Some(Viewport { width, height }),
                _ => None,
            },
        },
        CliCommand::Sessions => return Ok(None),
    };
    Ok(Some(action))
}

fn parse_script_args(raw: &[String]) -> Result<Option<Vec<Value>>, AppError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let mut parsed = Vec::with_capacity(raw.len());
    for argument in raw {
        let value = serde_json::from_str(argument).map_err(|source| AppError::ScriptArgument {
            argument: argument.clone(),
            source,
        })?;
        parsed.push(value);
    }
    Ok(Some(parsed))
}

fn wait_until_for(value: WaitUntilArg) -> WaitUntil {
    match value {
        WaitUntilArg::Load => WaitUntil::Load,
        WaitUntilArg::Domcontentloaded => WaitUntil::Domcontentloaded,
        WaitUntilArg::Networkidle => WaitUntil::Networkidle,
    }
}

fn button_for(value: MouseButtonArg) -> MouseButton {
    match value {
        MouseButtonArg::Left => MouseButton::Left,
        MouseButtonArg::Right => MouseButton::Right,
        MouseButtonArg::Middle => MouseButton::Middle,
    }
}

fn format_for(value: ImageFormatArg) -> ImageFormat {
    match value {
        ImageFormatArg::Png => ImageFormat::Png,
        ImageFormatArg::Jpeg => ImageFormat::Jpeg,
    }
}

fn state_for(value: WaitStateArg) -> WaitState {
    match value {
        WaitStateArg::Attached => WaitState::Attached,
        WaitStateArg::Detached => WaitState::Detached,
        WaitStateArg::Visible => WaitState::Visible,
        WaitStateArg::Hidden => WaitState::Hidden,
    }
}

fn direction_for(value: ScrollDirectionArg) -> ScrollDirection {
    match value {
        ScrollDirectionArg::Up => ScrollDirection::Up,
        ScrollDirectionArg::Down => ScrollDirection::Down,
        ScrollDirectionArg::Left => ScrollDirection::Left,
        ScrollDirectionArg::Right => ScrollDirection::Right,
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::expect_used, reason = "tests use expect for clarity")]
    use super::*;

    #[test]
    fn request_ids_are_unique_within_the_process() {
        let first = next_request_id();
        let second = next_request_id();
        assert_ne!(first, second);
    }

    #[test]
    fn sessions_is_answered_locally() {
        let action = action_for(CliCommand::Sessions).expect("valid");
        assert!(action.is_none());
    }

    #[test]
    fn evaluate_arguments_must_be_json() {
        let command = CliCommand::Evaluate {
            script: "1 + 1".to_owned(),
            args: vec!["{not json".to_owned()],
        };
        assert!(matches!(
            action_for(command),
            Err(AppError::ScriptArgument { .. })
        ));
    }

    #[test]
    fn evaluate_arguments_parse_into_values() {
        let command = CliCommand::Evaluate {
            script: "args[0]".to_owned(),
            args: vec!["42".to_owned(), r#"{"k":"v"}"#.to_owned()],
        };
        let Some(Action::Evaluate { args, .. }) = action_for(command).expect("valid") else {
            panic!("expected evaluate action");
        };
        assert_eq!(args, Some(vec![serde_json::json!(42), serde_json::json!({"k":"v"})]));
    }

    #[test]
    fn flags_only_appear_on_the_wire_when_set() {
        let command = CliCommand::Type {
            selector: "#field".to_owned(),
            text: "hello".to_owned(),
            delay: None,
            clear: false,
        };
        let Some(action) = action_for(command).expect("valid") else {
            panic!("expected an action");
        };
        let encoded = serde_json::to_string(&command_for(action)).expect("serialise");
        assert!(!encoded.contains("clear"));
        assert!(!encoded.contains("delay"));
    }
}
