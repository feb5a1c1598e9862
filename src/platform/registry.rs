//! "Run at Windows startup" registration.
//!
//! Stores the quoted executable path under the current user's Run key.

use std::path::Path;
use thiserror::Error;

/// Registry key holding per-user startup commands.
pub const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

/// Startup registration error types.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Run as admin to change startup behavior.")]
    PermissionDenied,

    #[error("Failed to access registry: {0}")]
    RegistryAccess(String),

    #[error("Failed to locate executable: {0}")]
    ExecutablePath(#[source] std::io::Error),
}

/// Command line written to the Run key for `exe`.
pub fn startup_command(exe: &Path) -> String {
    format!("\"{}\"", exe.display())
}

#[cfg(windows)]
pub use self::windows_impl::StartupRegistration;

#[cfg(windows)]
mod windows_impl {
    use super::{startup_command, StartupError, RUN_KEY};
    use tracing::info;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, WIN32_ERROR};
    use windows::Win32::System::Registry::{
        RegCloseKey, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
        HKEY_CURRENT_USER, KEY_READ, KEY_WRITE, REG_SAM_FLAGS, REG_SZ,
    };

    /// Registry-backed startup registration for one value name.
    pub struct StartupRegistration {
        run_key_path: Vec<u16>,
        value_name: Vec<u16>,
    }

    impl StartupRegistration {
        /// Create a registration for `app_name`.
        pub fn new(app_name: &str) -> Self {
            Self {
                run_key_path: to_wide(RUN_KEY),
                value_name: to_wide(app_name),
            }
        }

        fn open_run_key(&self, access: REG_SAM_FLAGS) -> Result<HKEY, WIN32_ERROR> {
            unsafe {
                let mut hkey = HKEY::default();
                let result = RegOpenKeyExW(
                    HKEY_CURRENT_USER,
                    PCWSTR::from_raw(self.run_key_path.as_ptr()),
                    0,
                    access,
                    &mut hkey,
                );
                if result.is_err() {
                    Err(result)
                } else {
                    Ok(hkey)
                }
            }
        }

        /// Check whether the startup value exists.
        pub fn is_enabled(&self) -> bool {
            let Ok(hkey) = self.open_run_key(KEY_READ) else {
                return false;
            };
            unsafe {
                let mut data_size = 0u32;
                let result = RegQueryValueExW(
                    hkey,
                    PCWSTR::from_raw(self.value_name.as_ptr()),
                    None,
                    None,
                    None,
                    Some(&mut data_size),
                );
                let _ = RegCloseKey(hkey);
                result.is_ok() && data_size > 0
            }
        }

        /// Register or unregister the current executable.
        pub fn set_enabled(&self, enabled: bool) -> Result<(), StartupError> {
            let hkey = self.open_run_key(KEY_WRITE).map_err(map_error)?;

            let result = if enabled {
                match std::env::current_exe() {
                    Ok(exe) => {
                        let command = to_wide(&startup_command(&exe));
                        unsafe {
                            RegSetValueExW(
                                hkey,
                                PCWSTR::from_raw(self.value_name.as_ptr()),
                                0,
                                REG_SZ,
                                Some(std::slice::from_raw_parts(
                                    command.as_ptr() as *const u8,
                                    command.len() * 2,
                                )),
                            )
                        }
                    }
                    Err(e) => {
                        unsafe {
                            let _ = RegCloseKey(hkey);
                        }
                        return Err(StartupError::ExecutablePath(e));
                    }
                }
            } else {
                unsafe { RegDeleteValueW(hkey, PCWSTR::from_raw(self.value_name.as_ptr())) }
            };

            unsafe {
                let _ = RegCloseKey(hkey);
            }

            // Removing a value that is not there is fine
            if result.is_err() && !(result == ERROR_FILE_NOT_FOUND && !enabled) {
                return Err(map_error(result));
            }

            info!(enabled, "startup registration updated");
            Ok(())
        }
    }

    fn map_error(code: WIN32_ERROR) -> StartupError {
        if code == ERROR_ACCESS_DENIED {
            StartupError::PermissionDenied
        } else {
            StartupError::RegistryAccess(format!("Win32 error {}", code.0))
        }
    }

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_startup_command_is_quoted() {
        let exe = PathBuf::from(r"C:\Program Files\Enforcer\mic-volume-enforcer.exe");
        assert_eq!(
            startup_command(&exe),
            r#""C:\Program Files\Enforcer\mic-volume-enforcer.exe""#
        );
    }

    #[test]
    fn test_permission_denied_message() {
        assert_eq!(
            StartupError::PermissionDenied.to_string(),
            "Run as admin to change startup behavior."
        );
    }
}
