//! Command and state codes of the rPDU MIB.
//!
//! Raw integers only cross this boundary through `code()` and
//! `TryFrom<i32>`; the rest of the crate passes the enums around.

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i32)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $code, )+
        }

        impl $name {
            /// Every value, in code order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire code.
            pub fn code(self) -> i32 {
                self as i32
            }

            /// Kebab-case name.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl TryFrom<i32> for $name {
            /// The rejected code.
            type Error = i32;

            fn try_from(code: i32) -> std::result::Result<Self, i32> {
                match code {
                    $( $code => Ok($name::$variant), )+
                    other => Err(other),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            /// Accepts the kebab-case name (any case) or the numeric code.
            fn from_str(s: &str) -> std::result::Result<Self, String> {
                if let Ok(code) = s.parse::<i32>() {
                    return $name::try_from(code)
                        .map_err(|code| format!("unknown {} code {}", stringify!($name), code));
                }
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(s))
                    .ok_or_else(|| format!("unknown {} '{}'", stringify!($name), s))
            }
        }
    };
}

code_enum! {
    /// Power state of one outlet (rPDUOutletStatusOutletState).
    pub enum OutletState {
        On = 1 => "on",
        Off = 2 => "off",
    }
}

code_enum! {
    /// Command for all outlets at once (rPDUOutletDevCommand).
    pub enum DeviceCommand {
        NoCommandAll = 1 => "no-command-all",
        ImmediateAllOn = 2 => "immediate-all-on",
        ImmediateAllOff = 3 => "immediate-all-off",
        ImmediateAllReboot = 4 => "immediate-all-reboot",
        /// Honours each outlet's configured power-on delay.
        DelayedAllOn = 5 => "delayed-all-on",
        DelayedAllOff = 6 => "delayed-all-off",
        DelayedAllReboot = 7 => "delayed-all-reboot",
        CancelAllPendingCommands = 8 => "cancel-all-pending-commands",
    }
}

code_enum! {
    /// Command for one outlet (rPDUOutletControlOutletCommand).
    pub enum OutletCommand {
        ImmediateOn = 1 => "immediate-on",
        ImmediateOff = 2 => "immediate-off",
        ImmediateReboot = 3 => "immediate-reboot",
        DelayedOn = 4 => "delayed-on",
        DelayedOff = 5 => "delayed-off",
        DelayedReboot = 6 => "delayed-reboot",
        CancelPendingCommand = 7 => "cancel-pending-command",
    }
}

code_enum! {
    /// Load state of the device (rPDULoadStatusLoadState).
    pub enum LoadState {
        Normal = 1 => "normal",
        Low = 2 => "low",
        NearOverload = 3 => "near-overload",
        Overload = 4 => "overload",
    }
}
