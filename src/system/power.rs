//! Session power actions: lock through `hyprlock`, the rest through
//! `systemctl`.

use super::{launch, SystemError};
use crate::traits::CommandRunner;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Lock,
    Hibernate,
    Reboot,
    PowerOff,
}

impl PowerAction {
    pub const ALL: [PowerAction; 4] = [
        PowerAction::Lock,
        PowerAction::Hibernate,
        PowerAction::Reboot,
        PowerAction::PowerOff,
    ];

    /// Command name as typed by the user.
    pub fn as_str(self) -> &'static str {
        match self {
            PowerAction::Lock => "lock",
            PowerAction::Hibernate => "hibernate",
            PowerAction::Reboot => "reboot",
            PowerAction::PowerOff => "poweroff",
        }
    }

    fn program(self) -> (&'static str, &'static [&'static str]) {
        match self {
            PowerAction::Lock => ("hyprlock", &[]),
            PowerAction::Hibernate => ("systemctl", &["hibernate"]),
            PowerAction::Reboot => ("systemctl", &["reboot"]),
            PowerAction::PowerOff => ("systemctl", &["poweroff"]),
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start `action` without waiting for it.
pub fn perform<R: CommandRunner + ?Sized>(runner: &R, action: PowerAction) -> Result<(), SystemError> {
    let (program, args) = action.program();
    launch(runner, program, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::testing::FakeRunner;

    #[test]
    fn each_action_spawns_its_tool() {
        let runner = FakeRunner::default();
        for action in PowerAction::ALL {
            perform(&runner, action).unwrap();
        }
        assert_eq!(
            *runner.spawned.borrow(),
            vec![
                "hyprlock".to_string(),
                "systemctl hibernate".to_string(),
                "systemctl reboot".to_string(),
                "systemctl poweroff".to_string(),
            ]
        );
        assert!(runner.calls.borrow().is_empty());
    }
}
