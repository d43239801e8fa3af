// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::{debug, info, warn};

use crate::config::{DevicePolicy, NegotiationConfig};
use crate::error::{NegotiationError, Result};
use crate::probe::{probe_extensions, probe_identity, probe_surface, Candidate, DeviceIdentity};
use crate::queues::{resolve_queue_families, QueueFamilies};
use crate::runtime::InstanceQueries;

/// A device that passed every suitability check.
#[derive(Clone, Debug)]
pub struct SelectedDevice {
    pub candidate: Candidate,
    pub identity: DeviceIdentity,
    pub queues: QueueFamilies,
}

impl SelectedDevice {
    pub fn handle(&self) -> vk::PhysicalDevice {
        self.candidate.handle
    }
}

/// Outcome of evaluating one device, kept for diagnostics.
#[derive(Debug)]
pub struct DeviceReport {
    pub index: usize,
    pub identity: DeviceIdentity,
    pub verdict: Result<QueueFamilies>,
}

impl DeviceReport {
    pub fn is_suitable(&self) -> bool {
        self.verdict.is_ok()
    }
}

pub fn enumerate_candidates(rt: &impl InstanceQueries) -> Result<Vec<Candidate>> {
    let handles = rt
        .physical_devices()
        .map_err(NegotiationError::Enumeration)?;
    if handles.is_empty() {
        return Err(NegotiationError::NoDevicesEnumerated);
    }
    Ok(handles
        .into_iter()
        .enumerate()
        .map(|(index, handle)| Candidate { index, handle })
        .collect())
}

/// Apply the suitability predicate to one device.
///
/// Checks run in order (queue roles, required extensions, surface sets) and
/// the first failing check is the returned rejection. Runtime query failures
/// come back as [`NegotiationError::Query`].
pub fn check_device(
    rt: &impl InstanceQueries,
    device: Candidate,
    config: &NegotiationConfig,
    surface: vk::SurfaceKHR,
) -> Result<QueueFamilies> {
    let queues = resolve_queue_families(rt, device, surface)?;

    let available = probe_extensions(rt, device)?;
    let missing: Vec<String> = config
        .required_extension_names()
        .filter(|name| !available.contains(*name))
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    if !missing.is_empty() {
        return Err(NegotiationError::MissingRequiredExtension {
            device: device.index,
            missing,
        });
    }

    let support = probe_surface(rt, device, surface)?;
    if !support.is_adequate() {
        return Err(NegotiationError::EmptySurfaceCapabilities {
            device: device.index,
            formats: support.formats.len(),
            present_modes: support.present_modes.len(),
        });
    }

    Ok(queues)
}

/// Pick the device the presentation pipeline will run on.
pub fn select_device(
    rt: &impl InstanceQueries,
    candidates: &[Candidate],
    config: &NegotiationConfig,
    surface: vk::SurfaceKHR,
) -> Result<SelectedDevice> {
    if candidates.is_empty() {
        return Err(NegotiationError::NoDevicesEnumerated);
    }

    let mut best: Option<(u32, SelectedDevice)> = None;

    for &candidate in candidates {
        let identity = probe_identity(rt, candidate);
        let queues = match check_device(rt, candidate, config, surface) {
            Ok(queues) => queues,
            Err(e) if e.is_rejection() => {
                warn!("skipping \"{}\": {e}", identity.name);
                continue;
            }
            Err(e) => return Err(e),
        };

        debug!(
            "device #{} \"{}\" ({:?}) is suitable",
            candidate.index, identity.name, identity.device_type
        );
        let score = identity.type_score();
        let selected = SelectedDevice {
            candidate,
            identity,
            queues,
        };

        match config.device_policy {
            DevicePolicy::FirstSuitable => {
                best = Some((score, selected));
                break;
            }
            DevicePolicy::PreferDiscrete => {
                if best.as_ref().map_or(true, |(s, _)| score > *s) {
                    best = Some((score, selected));
                }
            }
        }
    }

    let (_, selected) = best.ok_or(NegotiationError::NoSuitableDevice {
        examined: candidates.len(),
    })?;
    info!(
        "selected device #{} \"{}\" (graphics family {}, present family {})",
        selected.candidate.index,
        selected.identity.name,
        selected.queues.graphics(),
        selected.queues.present()
    );
    Ok(selected)
}

/// Evaluate every enumerated device without stopping at the first verdict.
pub fn survey_devices(
    rt: &impl InstanceQueries,
    config: &NegotiationConfig,
    surface: vk::SurfaceKHR,
) -> Result<Vec<DeviceReport>> {
    Ok(enumerate_candidates(rt)?
        .into_iter()
        .map(|candidate| DeviceReport {
            index: candidate.index,
            identity: probe_identity(rt, candidate),
            verdict: check_device(rt, candidate, config, surface),
        })
        .collect())
}
