//! Default capture device resolution using the Windows MMDevice API.
//!
//! Provides per-thread COM initialization and the Windows
//! [`CaptureProvider`](super::CaptureProvider).

use super::device::AudioError;
use super::volume::{CaptureProvider, EndpointVolume};
use tracing::debug;
use windows::Win32::Media::Audio::{
    eCapture, eConsole, IMMDevice, IMMDeviceEnumerator, MMDeviceEnumerator,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoTaskMemFree, CoUninitialize, CLSCTX_ALL,
    COINIT_MULTITHREADED,
};

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            // Enforcement runs on a background thread with no message pump
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(AudioError::ComInitFailed)?;
        }
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Opens the default console-role microphone.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsCaptureProvider;

impl WindowsCaptureProvider {
    pub fn new() -> Self {
        Self
    }

    fn default_capture_device(enumerator: &IMMDeviceEnumerator) -> Result<IMMDevice, AudioError> {
        unsafe {
            let device = enumerator
                .GetDefaultAudioEndpoint(eCapture, eConsole)
                .map_err(|e| {
                    AudioError::DeviceUnavailable(format!(
                        "no default microphone: {}",
                        e.message()
                    ))
                })?;

            if let Ok(id) = device.GetId() {
                debug!(device_id = %id.to_string().unwrap_or_default(), "resolved default capture device");
                CoTaskMemFree(Some(id.0 as *const _));
            }

            Ok(device)
        }
    }
}

impl CaptureProvider for WindowsCaptureProvider {
    type Handle = EndpointVolume;

    fn open_default_capture(&self) -> Result<EndpointVolume, AudioError> {
        let com = ComGuard::new()?;

        let enumerator: IMMDeviceEnumerator = unsafe {
            CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|e| {
                AudioError::DeviceUnavailable(format!("device enumerator: {}", e.message()))
            })?
        };

        let device = Self::default_capture_device(&enumerator)?;
        EndpointVolume::new(&device, com)
    }
}
