/*++

Licensed under the Apache-2.0 license.

File Name:

    macros.rs

Abstract:

    Macros used by the emulator types.

--*/

/// Declares a fieldless enum backed by an integer encoding.
///
/// The generated type converts into the raw encoding with `From`, and out of
/// it with `TryFrom`, which hands back the unrecognised raw value as the
/// error. `Display` prints the variant name.
#[macro_export]
macro_rules! emu_enum {
    (
        $(#[$($enum_attrs:tt)*])*
        $vis:vis $enum_name:ident;
        $type:ty;
        {
            $(
                $(#[$($attrs:tt)*])*
                $name:ident = $value:literal,
            )*
        }
    ) => {
        $(#[$($enum_attrs)*])*
        $vis enum $enum_name {
            $(
                $(#[$($attrs)*])*
                $name = $value,
            )*
        }

        impl From<$enum_name> for $type {
            fn from(val: $enum_name) -> $type {
                match val {
                    $($enum_name::$name => $value,)*
                }
            }
        }

        impl TryFrom<$type> for $enum_name {
            type Error = $type;

            fn try_from(val: $type) -> Result<$enum_name, $type> {
                match val {
                    $($value => Ok($enum_name::$name),)*
                    other => Err(other),
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match self {
                    $($enum_name::$name => write!(f, stringify!($name)),)*
                }
            }
        }
    };
}
