//! Volume control for the default capture endpoint.
//!
//! The enforcement loop talks to the device through [`CaptureProvider`] and
//! [`CaptureVolume`]. On Windows these are backed by `IAudioEndpointVolume`.

use super::device::{AudioError, VolumeRange};

/// An open handle on a capture device's master volume.
///
/// Dropping the handle releases the device binding.
pub trait CaptureVolume {
    /// Query the device-reported decibel range.
    fn volume_range(&self) -> Result<VolumeRange, AudioError>;

    /// Set the master capture level in dB.
    fn set_level(&self, level_db: f32) -> Result<(), AudioError>;
}

/// Resolves the system's default capture device.
///
/// Shared across activations; each activation opens its own handle on its
/// own thread, so the handle type does not need to be `Send`.
pub trait CaptureProvider: Send + Sync + 'static {
    type Handle: CaptureVolume;

    /// Open the current default microphone.
    fn open_default_capture(&self) -> Result<Self::Handle, AudioError>;
}

#[cfg(windows)]
pub use self::windows_impl::EndpointVolume;

#[cfg(windows)]
mod windows_impl {
    use super::super::device::{AudioError, VolumeRange};
    use super::super::enumerator::ComGuard;
    use super::CaptureVolume;
    use windows::Win32::Media::Audio::{Endpoints::IAudioEndpointVolume, IMMDevice};
    use windows::Win32::System::Com::CLSCTX_ALL;
    use windows_core::HRESULT;

    /// The endpoint was invalidated (unplugged, disabled, default changed).
    const AUDCLNT_E_DEVICE_INVALIDATED: HRESULT = HRESULT(0x8889_0004_u32 as i32);
    /// Element not found.
    const E_NOTFOUND: HRESULT = HRESULT(0x8007_0490_u32 as i32);

    /// Endpoint volume handle for one capture device.
    pub struct EndpointVolume {
        // Released before COM is torn down for this thread.
        endpoint_volume: IAudioEndpointVolume,
        _com: ComGuard,
    }

    impl EndpointVolume {
        /// Activate the volume interface on `device`.
        pub(crate) fn new(device: &IMMDevice, com: ComGuard) -> Result<Self, AudioError> {
            unsafe {
                let endpoint_volume: IAudioEndpointVolume =
                    device.Activate(CLSCTX_ALL, None).map_err(|e| {
                        AudioError::DeviceUnavailable(format!(
                            "volume control not available: {}",
                            e.message()
                        ))
                    })?;

                Ok(Self {
                    endpoint_volume,
                    _com: com,
                })
            }
        }
    }

    fn classify(err: windows::core::Error) -> AudioError {
        let code = err.code();
        if code == AUDCLNT_E_DEVICE_INVALIDATED || code == E_NOTFOUND {
            AudioError::DeviceUnavailable(format!("{:#010x}: {}", code.0, err.message()))
        } else {
            AudioError::SetRejected(format!("{:#010x}: {}", code.0, err.message()))
        }
    }

    impl CaptureVolume for EndpointVolume {
        fn volume_range(&self) -> Result<VolumeRange, AudioError> {
            let mut min_db = 0.0f32;
            let mut max_db = 0.0f32;
            let mut step_db = 0.0f32;
            unsafe {
                self.endpoint_volume
                    .GetVolumeRange(&mut min_db, &mut max_db, &mut step_db)
                    .map_err(|e| AudioError::DeviceUnavailable(e.message().to_string()))?;
            }
            Ok(VolumeRange {
                min_db,
                max_db,
                step_db,
            })
        }

        fn set_level(&self, level_db: f32) -> Result<(), AudioError> {
            unsafe {
                self.endpoint_volume
                    .SetMasterVolumeLevel(level_db, std::ptr::null())
                    .map_err(classify)
            }
        }
    }
}
