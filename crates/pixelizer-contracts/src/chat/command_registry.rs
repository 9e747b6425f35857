#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is one setting value.
pub(crate) const SETTING_COMMANDS: &[(CommandSpec, &str)] = &[
    (
        CommandSpec {
            command: "mode",
            action: "set_mode",
        },
        "mode",
    ),
    (
        CommandSpec {
            command: "quality",
            action: "set_quality",
        },
        "quality",
    ),
    (
        CommandSpec {
            command: "size",
            action: "set_size",
        },
        "size",
    ),
    (
        CommandSpec {
            command: "stream",
            action: "set_stream",
        },
        "stream",
    ),
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "upload",
        action: "upload",
    },
    CommandSpec {
        command: "pixelize",
        action: "pixelize",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "reset",
        action: "reset",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/upload <path>",
    "/pixelize [path]",
    "/reset",
    "/mode <direct|composite>",
    "/quality <auto|low|medium|high|standard|hd>",
    "/size <WxH>",
    "/stream <on|off>",
    "/status",
    "/help",
    "/quit",
];
