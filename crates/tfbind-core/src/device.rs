use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Compute device selection, resolved once when the application context is built.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// CUDA, then Metal, then CPU.
    #[default]
    Auto,
    Cpu,
    Cuda,
    Metal,
}

pub fn device(preference: DevicePreference) -> Result<Device> {
    match preference {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda => Device::new_cuda(0),
        DevicePreference::Metal => Device::new_metal(0),
        DevicePreference::Auto => {
            if cuda_is_available() {
                Device::new_cuda(0)
            } else if metal_is_available() {
                Device::new_metal(0)
            } else {
                #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
                {
                    tracing::info!(
                        "Running on CPU, to run on GPU(metal), build with `--features metal`"
                    );
                }
                #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
                {
                    tracing::info!("Running on CPU, to run on GPU, build with `--features cuda`");
                }
                Ok(Device::Cpu)
            }
        }
    }
}
