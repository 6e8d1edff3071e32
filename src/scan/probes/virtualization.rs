//! Virtualization probe and evidence scorer.
//!
//! Running inside a VM or sandbox is a common way to hide cheat tooling
//! from scans, but every individual signal here is weak on its own (MAC
//! OUI prefixes get reused, guest-sounding driver names exist on bare
//! metal). Indicators are therefore collected per candidate product
//! across independent categories, and a product is only reported once at
//! least two distinct categories agree. Single-category matches are
//! discarded as noise.

use std::collections::BTreeSet;
use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;

use crate::constants::VM_MIN_INDICATOR_CATEGORIES;
use crate::decode::csv::parse_csv;
use crate::error::ScanError;
use crate::models::ScanGroup;
use crate::scan::context::ScanContext;
use crate::scan::progress::FindingSink;
use crate::scan::Scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VmProduct {
    VMware,
    VirtualBox,
    HyperV,
    Qemu,
    Parallels,
}

impl std::fmt::Display for VmProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VmProduct::VMware => "VMware",
            VmProduct::VirtualBox => "VirtualBox",
            VmProduct::HyperV => "Hyper-V",
            VmProduct::Qemu => "QEMU/KVM",
            VmProduct::Parallels => "Parallels",
        };
        f.write_str(name)
    }
}

/// Independent evidence categories. Two indicators from the same
/// category never corroborate each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorCategory {
    Hardware,
    MacPrefix,
    GuestProcess,
    GuestService,
    GuestDriver,
    RegistryKey,
    Environment,
}

impl std::fmt::Display for IndicatorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IndicatorCategory::Hardware => "hardware id",
            IndicatorCategory::MacPrefix => "MAC prefix",
            IndicatorCategory::GuestProcess => "guest process",
            IndicatorCategory::GuestService => "guest service",
            IndicatorCategory::GuestDriver => "guest driver",
            IndicatorCategory::RegistryKey => "registry key",
            IndicatorCategory::Environment => "environment",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Indicator {
    pub product: VmProduct,
    pub category: IndicatorCategory,
    pub detail: String,
}

/// A product that accumulated enough independent evidence.
#[derive(Debug)]
pub struct VmDetection {
    pub product: VmProduct,
    pub categories: BTreeSet<IndicatorCategory>,
    pub details: Vec<String>,
}

/// Threshold-based aggregation: group by product, require at least two
/// distinct categories.
pub fn score_indicators(indicators: &[Indicator]) -> Vec<VmDetection> {
    let mut by_product: HashMap<VmProduct, (BTreeSet<IndicatorCategory>, Vec<String>)> =
        HashMap::new();
    for indicator in indicators {
        let entry = by_product.entry(indicator.product).or_default();
        entry.0.insert(indicator.category);
        entry.1.push(format!("{}: {}", indicator.category, indicator.detail));
    }

    let mut detections: Vec<VmDetection> = by_product
        .into_iter()
        .filter(|(_, (categories, _))| categories.len() >= VM_MIN_INDICATOR_CATEGORIES)
        .map(|(product, (categories, details))| VmDetection {
            product,
            categories,
            details,
        })
        .collect();
    detections.sort_by_key(|d| d.product);
    detections
}

// Marker tables. Matching is case-insensitive substring over the
// relevant sub-field only.

const HARDWARE_MARKERS: &[(&str, VmProduct)] = &[
    ("vmware", VmProduct::VMware),
    ("virtualbox", VmProduct::VirtualBox),
    ("innotek", VmProduct::VirtualBox),
    ("vbox", VmProduct::VirtualBox),
    ("virtual machine", VmProduct::HyperV),
    ("qemu", VmProduct::Qemu),
    ("bochs", VmProduct::Qemu),
    ("parallels", VmProduct::Parallels),
];

const MAC_PREFIXES: &[(&str, VmProduct)] = &[
    ("00:05:69", VmProduct::VMware),
    ("00:0C:29", VmProduct::VMware),
    ("00:1C:14", VmProduct::VMware),
    ("00:50:56", VmProduct::VMware),
    ("08:00:27", VmProduct::VirtualBox),
    ("00:15:5D", VmProduct::HyperV),
    ("52:54:00", VmProduct::Qemu),
    ("00:1C:42", VmProduct::Parallels),
];

const GUEST_PROCESSES: &[(&str, VmProduct)] = &[
    ("vmtoolsd.exe", VmProduct::VMware),
    ("vmwaretray.exe", VmProduct::VMware),
    ("vmwareuser.exe", VmProduct::VMware),
    ("vboxservice.exe", VmProduct::VirtualBox),
    ("vboxtray.exe", VmProduct::VirtualBox),
    ("vmicsvc.exe", VmProduct::HyperV),
    ("qemu-ga.exe", VmProduct::Qemu),
    ("prl_cc.exe", VmProduct::Parallels),
    ("prl_tools.exe", VmProduct::Parallels),
];

const GUEST_SERVICES: &[(&str, VmProduct)] = &[
    ("vmtools", VmProduct::VMware),
    ("vmware", VmProduct::VMware),
    ("vboxservice", VmProduct::VirtualBox),
    ("vmic", VmProduct::HyperV),
    ("qemu-ga", VmProduct::Qemu),
    ("prl_tools", VmProduct::Parallels),
];

const GUEST_DRIVERS: &[(&str, VmProduct)] = &[
    ("vmci", VmProduct::VMware),
    ("vmhgfs", VmProduct::VMware),
    ("vmmouse", VmProduct::VMware),
    ("vmxnet", VmProduct::VMware),
    ("vboxguest", VmProduct::VirtualBox),
    ("vboxmouse", VmProduct::VirtualBox),
    ("vboxsf", VmProduct::VirtualBox),
    ("vmbus", VmProduct::HyperV),
    ("hyperkbd", VmProduct::HyperV),
    ("virtio", VmProduct::Qemu),
    ("prl_fs", VmProduct::Parallels),
];

const GUEST_REGISTRY_KEYS: &[(&str, VmProduct)] = &[
    ("HKLM\\SOFTWARE\\VMware, Inc.\\VMware Tools", VmProduct::VMware),
    (
        "HKLM\\SOFTWARE\\Oracle\\VirtualBox Guest Additions",
        VmProduct::VirtualBox,
    ),
    ("HKLM\\HARDWARE\\ACPI\\DSDT\\VBOX__", VmProduct::VirtualBox),
    (
        "HKLM\\SOFTWARE\\Microsoft\\Virtual Machine\\Guest\\Parameters",
        VmProduct::HyperV,
    ),
    ("HKLM\\SOFTWARE\\QEMU Guest Agent", VmProduct::Qemu),
    ("HKLM\\SOFTWARE\\Parallels\\Parallels Tools", VmProduct::Parallels),
];

const ENV_MARKERS: &[(&str, VmProduct)] = &[
    ("vbox", VmProduct::VirtualBox),
    ("vmware", VmProduct::VMware),
    ("qemu", VmProduct::Qemu),
    ("parallels", VmProduct::Parallels),
];

/// Normalize a MAC string to colon-separated upper-case form.
fn normalize_mac(raw: &str) -> String {
    raw.trim().replace('-', ":").to_uppercase()
}

/// Indicators from `wmic ... /format:list` hardware output.
pub fn hardware_indicators(text: &str) -> Vec<Indicator> {
    let mut indicators = Vec::new();
    for line in text.lines() {
        let Some((field, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let lower = value.to_lowercase();
        for (marker, product) in HARDWARE_MARKERS {
            if lower.contains(marker) {
                indicators.push(Indicator {
                    product: *product,
                    category: IndicatorCategory::Hardware,
                    detail: format!("{}={}", field.trim(), value),
                });
            }
        }
    }
    indicators
}

/// Indicators from `getmac /fo csv /nh` output (first column).
pub fn mac_indicators(csv_text: &str) -> Vec<Indicator> {
    let mut indicators = Vec::new();
    for row in parse_csv(csv_text) {
        let Some(mac) = row.first() else { continue };
        let mac = normalize_mac(mac);
        for (prefix, product) in MAC_PREFIXES {
            if mac.starts_with(prefix) {
                indicators.push(Indicator {
                    product: *product,
                    category: IndicatorCategory::MacPrefix,
                    detail: mac.clone(),
                });
            }
        }
    }
    indicators
}

/// Indicators from `tasklist /svc /fo csv /nh`: image names (guest
/// processes) and the services column (guest services).
pub fn tasklist_indicators(csv_text: &str) -> Vec<Indicator> {
    let mut indicators = Vec::new();
    for row in parse_csv(csv_text) {
        if let Some(image) = row.first() {
            let image_lower = image.to_lowercase();
            for (marker, product) in GUEST_PROCESSES {
                if image_lower == *marker {
                    indicators.push(Indicator {
                        product: *product,
                        category: IndicatorCategory::GuestProcess,
                        detail: image.clone(),
                    });
                }
            }
        }
        if let Some(services) = row.get(2) {
            let services_lower = services.to_lowercase();
            for (marker, product) in GUEST_SERVICES {
                if services_lower.contains(marker) {
                    indicators.push(Indicator {
                        product: *product,
                        category: IndicatorCategory::GuestService,
                        detail: services.clone(),
                    });
                }
            }
        }
    }
    indicators
}

/// Indicators from `driverquery /fo csv /nh` (module name column).
pub fn driver_indicators(csv_text: &str) -> Vec<Indicator> {
    let mut indicators = Vec::new();
    for row in parse_csv(csv_text) {
        let Some(module) = row.first() else { continue };
        let module_lower = module.to_lowercase();
        for (marker, product) in GUEST_DRIVERS {
            if module_lower.contains(marker) {
                indicators.push(Indicator {
                    product: *product,
                    category: IndicatorCategory::GuestDriver,
                    detail: module.clone(),
                });
            }
        }
    }
    indicators
}

/// Indicators from the local environment block.
pub fn env_indicators<I: Iterator<Item = (String, String)>>(vars: I) -> Vec<Indicator> {
    let mut indicators = Vec::new();
    for (name, value) in vars {
        let combined = format!("{name}={value}").to_lowercase();
        for (marker, product) in ENV_MARKERS {
            if combined.contains(marker) {
                indicators.push(Indicator {
                    product: *product,
                    category: IndicatorCategory::Environment,
                    detail: name.clone(),
                });
            }
        }
    }
    indicators
}

pub struct VirtualizationProbe;

impl VirtualizationProbe {
    /// Run one collection command, tolerating failure: a missing tool
    /// yields no indicators, not a failed probe.
    async fn try_run(&self, ctx: &ScanContext, program: &str, args: &[&str]) -> Option<String> {
        match ctx.executor.run(program, args).await {
            Ok(output) => Some(output),
            Err(e) => {
                debug!("{program} query failed: {e}");
                None
            }
        }
    }

    async fn collect_indicators(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<Vec<Indicator>, ScanError> {
        let mut indicators = Vec::new();
        let steps = 6;

        ctx.check_cancelled()?;
        out.progress(0, steps, "hardware identifiers");
        for args in [
            &["computersystem", "get", "manufacturer,model", "/format:list"][..],
            &["bios", "get", "serialnumber,smbiosbiosversion", "/format:list"][..],
        ] {
            if let Some(text) = self.try_run(ctx, "wmic", args).await {
                indicators.extend(hardware_indicators(&text));
            }
        }

        ctx.check_cancelled()?;
        out.progress(1, steps, "MAC addresses");
        if let Some(text) = self.try_run(ctx, "getmac", &["/fo", "csv", "/nh"]).await {
            indicators.extend(mac_indicators(&text));
        }

        ctx.check_cancelled()?;
        out.progress(2, steps, "guest processes and services");
        if let Some(text) = self
            .try_run(ctx, "tasklist", &["/svc", "/fo", "csv", "/nh"])
            .await
        {
            indicators.extend(tasklist_indicators(&text));
        }

        ctx.check_cancelled()?;
        out.progress(3, steps, "guest drivers");
        if let Some(text) = self
            .try_run(ctx, "driverquery", &["/fo", "csv", "/nh"])
            .await
        {
            indicators.extend(driver_indicators(&text));
        }

        ctx.check_cancelled()?;
        out.progress(4, steps, "guest registry keys");
        for (key, product) in GUEST_REGISTRY_KEYS {
            if self.try_run(ctx, "reg", &["query", key]).await.is_some() {
                indicators.push(Indicator {
                    product: *product,
                    category: IndicatorCategory::RegistryKey,
                    detail: (*key).to_string(),
                });
            }
        }

        ctx.check_cancelled()?;
        out.progress(5, steps, "environment");
        indicators.extend(env_indicators(std::env::vars()));

        Ok(indicators)
    }
}

#[async_trait]
impl Scanner for VirtualizationProbe {
    fn name(&self) -> &'static str {
        "Virtualization"
    }

    fn group(&self) -> ScanGroup {
        ScanGroup::Registry
    }

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError> {
        let indicators = self.collect_indicators(ctx, out).await?;
        debug!("collected {} raw virtualization indicator(s)", indicators.len());

        for detection in score_indicators(&indicators) {
            out.push(format!(
                "{} detected via {} independent categories ({})",
                detection.product,
                detection.categories.len(),
                detection.details.join("; ")
            ));
        }
        out.progress(6, 6, "");
        Ok(())
    }
}
