use configurator::capability::{CapabilityError, CapabilityProbe, StaticProbe};

/// Asks wgpu for a high-performance adapter. A CPU adapter counts as no
/// hardware acceleration.
#[derive(Debug, Default)]
pub struct WgpuProbe;

impl CapabilityProbe for WgpuProbe {
    fn probe(&self) -> Result<(), CapabilityError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|_| CapabilityError::NoAdapter)?;

        let info = adapter.get_info();
        tracing::debug!(adapter = %info.name, backend = ?info.backend, "graphics adapter found");
        if info.device_type == wgpu::DeviceType::Cpu {
            return Err(CapabilityError::SoftwareOnly { adapter: info.name });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum HostProbe {
    Wgpu(WgpuProbe),
    Disabled(StaticProbe),
}

impl HostProbe {
    pub fn new(no_3d: bool) -> Self {
        if no_3d {
            HostProbe::Disabled(StaticProbe::failing(CapabilityError::Disabled(
                "--no-3d".to_string(),
            )))
        } else {
            HostProbe::Wgpu(WgpuProbe)
        }
    }
}

impl CapabilityProbe for HostProbe {
    fn probe(&self) -> Result<(), CapabilityError> {
        match self {
            HostProbe::Wgpu(probe) => probe.probe(),
            HostProbe::Disabled(probe) => probe.probe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_probe_never_touches_the_gpu() {
        let probe = HostProbe::new(true);
        assert!(matches!(probe, HostProbe::Disabled(_)));
        assert!(matches!(probe.probe(), Err(CapabilityError::Disabled(_))));
    }
}
