//! Physical device selection and queue family resolution.
//!
//! Both steps are pure functions over enumerated data so they can be
//! exercised without a GPU. The Vulkan backend feeds them with what the
//! driver reports.
//!
//! Selection uses a fixed priority: discrete GPU, then integrated GPU, then
//! the first device enumerated. Ties go to the earlier device, so the result
//! depends on the driver's enumeration order, which is not guaranteed to be
//! stable across platforms.

use ash::vk;

use crate::error::{GraphicsError, QueueKind};

/// Adapter type (discrete, integrated, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AdapterType {
    /// Discrete GPU.
    Discrete,
    /// Integrated GPU.
    Integrated,
    /// Virtual GPU.
    Virtual,
    /// CPU-based rendering.
    Cpu,
    /// Unknown adapter type.
    #[default]
    Other,
}

impl From<vk::PhysicalDeviceType> for AdapterType {
    fn from(device_type: vk::PhysicalDeviceType) -> Self {
        match device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => Self::Discrete,
            vk::PhysicalDeviceType::INTEGRATED_GPU => Self::Integrated,
            vk::PhysicalDeviceType::VIRTUAL_GPU => Self::Virtual,
            vk::PhysicalDeviceType::CPU => Self::Cpu,
            _ => Self::Other,
        }
    }
}

/// What the selector needs to know about one enumerated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Device name reported by the driver.
    pub name: String,
    /// Device class.
    pub device_type: AdapterType,
}

impl AdapterInfo {
    /// Create adapter info.
    pub fn new(name: impl Into<String>, device_type: AdapterType) -> Self {
        Self {
            name: name.into(),
            device_type,
        }
    }
}

/// Pick one adapter: the first discrete GPU, else the first integrated GPU,
/// else the first adapter. Returns `None` for an empty list.
pub fn select_adapter(adapters: &[AdapterInfo]) -> Option<usize> {
    let first_of = |wanted: AdapterType| adapters.iter().position(|a| a.device_type == wanted);

    let selected = first_of(AdapterType::Discrete)
        .or_else(|| first_of(AdapterType::Integrated))
        .or(if adapters.is_empty() { None } else { Some(0) })?;

    log::info!(
        "Selected GPU #{}: {} ({:?}) out of {} candidate(s)",
        selected,
        adapters[selected].name,
        adapters[selected].device_type,
        adapters.len()
    );

    Some(selected)
}

/// Capabilities of one queue family on the selected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueFamilyInfo {
    /// The family's flags include graphics.
    pub supports_graphics: bool,
    /// The family can present to the target surface.
    pub supports_present: bool,
}

/// Graphics and present queue family indices.
///
/// The two may be equal, in which case one queue serves both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueFamilyIndices {
    /// Family used for command submission.
    pub graphics: u32,
    /// Family used for presentation.
    pub present: u32,
}

impl QueueFamilyIndices {
    /// Whether one family serves both roles.
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct family indices, graphics first.
    ///
    /// Used for concurrent swapchain sharing and for device queue creation.
    pub fn unique(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Find the first graphics family and the first present-capable family.
pub fn find_queue_families(
    families: &[QueueFamilyInfo],
) -> Result<QueueFamilyIndices, GraphicsError> {
    let graphics = families
        .iter()
        .position(|f| f.supports_graphics)
        .ok_or(GraphicsError::MissingQueueFamily(QueueKind::Graphics))?;
    let present = families
        .iter()
        .position(|f| f.supports_present)
        .ok_or(GraphicsError::MissingQueueFamily(QueueKind::Present))?;

    let indices = QueueFamilyIndices {
        graphics: graphics as u32,
        present: present as u32,
    };

    log::info!(
        "Queue families: graphics={}, present={}{}",
        indices.graphics,
        indices.present,
        if indices.is_shared() { " (shared)" } else { "" }
    );

    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use super::AdapterType::*;

    fn adapters(types: &[AdapterType]) -> Vec<AdapterInfo> {
        types
            .iter()
            .enumerate()
            .map(|(i, &t)| AdapterInfo::new(format!("gpu{i}"), t))
            .collect()
    }

    #[rstest]
    #[case::discrete_wins(&[Integrated, Discrete], Some(1))]
    #[case::first_discrete_wins(&[Cpu, Discrete, Integrated, Discrete], Some(1))]
    #[case::integrated_over_others(&[Cpu, Virtual, Integrated], Some(2))]
    #[case::first_integrated_wins(&[Integrated, Integrated], Some(0))]
    #[case::fallback_to_first(&[Virtual, Cpu], Some(0))]
    #[case::single(&[Other], Some(0))]
    #[case::empty(&[], None)]
    fn test_select_adapter(#[case] types: &[AdapterType], #[case] expected: Option<usize>) {
        assert_eq!(select_adapter(&adapters(types)), expected);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let list = adapters(&[Integrated, Discrete, Discrete]);
        let first = select_adapter(&list);
        for _ in 0..10 {
            assert_eq!(select_adapter(&list), first);
        }
    }

    #[test]
    fn test_adapter_type_from_vk() {
        assert_eq!(
            AdapterType::from(vk::PhysicalDeviceType::DISCRETE_GPU),
            Discrete
        );
        assert_eq!(
            AdapterType::from(vk::PhysicalDeviceType::INTEGRATED_GPU),
            Integrated
        );
        assert_eq!(AdapterType::from(vk::PhysicalDeviceType::OTHER), Other);
    }

    const GFX: QueueFamilyInfo = QueueFamilyInfo {
        supports_graphics: true,
        supports_present: false,
    };
    const PRESENT: QueueFamilyInfo = QueueFamilyInfo {
        supports_graphics: false,
        supports_present: true,
    };
    const BOTH: QueueFamilyInfo = QueueFamilyInfo {
        supports_graphics: true,
        supports_present: true,
    };
    const NONE: QueueFamilyInfo = QueueFamilyInfo {
        supports_graphics: false,
        supports_present: false,
    };

    #[rstest]
    #[case::shared(&[BOTH], 0, 0)]
    #[case::split(&[GFX, PRESENT], 0, 1)]
    #[case::first_match_each(&[NONE, GFX, BOTH, PRESENT], 1, 2)]
    #[case::first_both(&[BOTH, BOTH], 0, 0)]
    fn test_find_queue_families(
        #[case] families: &[QueueFamilyInfo],
        #[case] graphics: u32,
        #[case] present: u32,
    ) {
        let indices = find_queue_families(families).unwrap();
        assert_eq!(indices, QueueFamilyIndices { graphics, present });
    }

    #[rstest]
    #[case::no_graphics(&[PRESENT, NONE], QueueKind::Graphics)]
    #[case::no_present(&[GFX, NONE], QueueKind::Present)]
    #[case::no_families(&[], QueueKind::Graphics)]
    fn test_missing_queue_family(#[case] families: &[QueueFamilyInfo], #[case] kind: QueueKind) {
        assert!(matches!(
            find_queue_families(families),
            Err(GraphicsError::MissingQueueFamily(k)) if k == kind
        ));
    }

    #[test]
    fn test_unique_indices() {
        let shared = QueueFamilyIndices {
            graphics: 2,
            present: 2,
        };
        assert!(shared.is_shared());
        assert_eq!(shared.unique(), vec![2]);

        let split = QueueFamilyIndices {
            graphics: 0,
            present: 3,
        };
        assert!(!split.is_shared());
        assert_eq!(split.unique(), vec![0, 3]);
    }
}
