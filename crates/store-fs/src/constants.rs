//! Constants shared by the store modules.

/// Prefix of temporary files created inside the store root.
pub const TEMP_FILE_PREFIX: &str = ".store-";

/// Suffix of temporary files created inside the store root.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Longest file name component accepted on every supported platform.
pub const MAX_NAME_BYTES: usize = 255;

/// Characters that at least one major platform refuses in file names.
pub const INVALID_NAME_CHARS: &[char] = &['"', '*', '/', ':', '<', '>', '?', '\\', '|'];

/// Windows device names that cannot be used as file names.
pub const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];
