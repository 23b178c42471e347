//! Backend abstraction - Multi-backend support
//!
//! Supports CUDA (GPU) and NdArray (CPU) backends. The backend type is fixed at
//! compile time; the concrete device is chosen once at startup through
//! [`ComputeDevice`] and then passed explicitly to every tensor-producing call.

use burn::backend::Autodiff;
use burn::tensor::backend::Backend;

use crate::utils::error::{EyeDiseaseError, Result};

// --------------------------------------------------------------------------------
// BACKEND SELECTION: CUDA (preferred) or NdArray (fallback)
// --------------------------------------------------------------------------------

#[cfg(feature = "cuda")]
pub type DefaultBackend = burn_cuda::Cuda;

#[cfg(all(not(feature = "cuda"), any(feature = "ndarray", feature = "cpu")))]
pub type DefaultBackend = burn_ndarray::NdArray;

#[cfg(all(not(feature = "cuda"), not(feature = "ndarray"), not(feature = "cpu")))]
compile_error!("At least one backend (cuda, ndarray, or cpu) must be enabled!");

/// The default autodiff backend for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Device handle of the compiled backend
pub type BackendDevice = <DefaultBackend as Backend>::Device;

/// Where tensors live for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    /// NVIDIA GPU with the given ordinal
    Cuda(usize),
    /// Host CPU through NdArray
    Cpu,
}

impl ComputeDevice {
    /// Resolve the preferred device: CUDA when compiled in, otherwise CPU
    pub fn detect() -> Self {
        #[cfg(feature = "cuda")]
        {
            ComputeDevice::Cuda(0)
        }

        #[cfg(not(feature = "cuda"))]
        {
            ComputeDevice::Cpu
        }
    }

    /// Human-readable name
    pub fn name(&self) -> String {
        match self {
            ComputeDevice::Cuda(index) => format!("CUDA (GPU {})", index),
            ComputeDevice::Cpu => "NdArray (CPU)".to_string(),
        }
    }

    /// Whether this choice needs GPU acceleration
    pub fn is_gpu(&self) -> bool {
        matches!(self, ComputeDevice::Cuda(_))
    }

    /// Convert into the device type of the compiled backend
    pub fn to_device(&self) -> Result<BackendDevice> {
        #[cfg(feature = "cuda")]
        {
            match self {
                ComputeDevice::Cuda(index) => Ok(burn_cuda::CudaDevice::new(*index)),
                ComputeDevice::Cpu => Err(EyeDiseaseError::Config(
                    "this build uses the CUDA backend; CPU execution is not available".to_string(),
                )),
            }
        }

        #[cfg(not(feature = "cuda"))]
        {
            match self {
                ComputeDevice::Cpu => Ok(burn_ndarray::NdArrayDevice::Cpu),
                ComputeDevice::Cuda(_) => Err(EyeDiseaseError::Config(
                    "CUDA requested but the crate was built without the `cuda` feature".to_string(),
                )),
            }
        }
    }
}

impl std::fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detected_device_converts() {
        let compute = ComputeDevice::detect();
        assert!(compute.to_device().is_ok());
        assert!(!compute.name().is_empty());
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_cpu_build_rejects_cuda() {
        assert_eq!(ComputeDevice::detect(), ComputeDevice::Cpu);
        assert!(!ComputeDevice::detect().is_gpu());
        assert!(ComputeDevice::Cuda(0).to_device().is_err());
    }
}
