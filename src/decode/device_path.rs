//! Kernel device-path to drive-letter resolution.
//!
//! Execution-history artifacts (BAM/DAM) record executables as
//! `\Device\HarddiskVolumeN\...`. The scanner resolves those to
//! `X:\...` through a volume→letter map built once per run from a
//! `QueryDosDevice` enumeration. Unresolvable paths pass through
//! unchanged so keyword matching still sees the trailing filename.

use std::collections::HashMap;

use log::debug;

/// PowerShell enumeration printing one `X=\Device\HarddiskVolumeN` line
/// per mapped drive letter. Run under `powershell`, falling back to
/// `pwsh` when Windows PowerShell is unavailable.
pub const DRIVE_QUERY_SCRIPT: &str = concat!(
    "$sig='[DllImport(\"kernel32.dll\",CharSet=CharSet.Auto)]",
    "public static extern uint QueryDosDevice(string n,System.Text.StringBuilder b,int m);';",
    "$k=Add-Type -MemberDefinition $sig -Name Q -Namespace W -PassThru;",
    "foreach($d in 65..90){$l=[char]$d;$sb=New-Object System.Text.StringBuilder 520;",
    "if($k::QueryDosDevice(\"${l}:\",$sb,520) -ne 0){\"${l}=$($sb.ToString())\"}}"
);

const DEVICE_PREFIX: &str = "\\device\\harddiskvolume";

/// Volume-number → drive-letter cache, valid for one scan run.
#[derive(Debug, Default, Clone)]
pub struct DriveMap {
    volumes: HashMap<u32, char>,
}

impl DriveMap {
    /// Empty map: every path resolves to itself.
    pub fn empty() -> Self {
        DriveMap::default()
    }

    /// Build the map from `X=\Device\HarddiskVolumeN` query output.
    /// Unparseable lines are skipped.
    pub fn from_query_output(text: &str) -> Self {
        let mut volumes = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            let Some((left, right)) = line.split_once('=') else {
                continue;
            };
            let letter = match left.trim().trim_end_matches(':').chars().next() {
                Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
                _ => continue,
            };
            if let Some(volume) = parse_volume_number(right.trim()) {
                volumes.insert(volume, letter);
            }
        }
        debug!("drive map resolved {} volume(s)", volumes.len());
        DriveMap { volumes }
    }

    /// Resolve one device path to drive-letter form, or return it as-is.
    pub fn resolve(&self, device_path: &str) -> String {
        let Some((volume, rest)) = split_device_path(device_path) else {
            return device_path.to_string();
        };
        match self.volumes.get(&volume) {
            Some(letter) => format!("{letter}:{rest}"),
            None => device_path.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Split `\Device\HarddiskVolumeN<rest>` into (N, rest), ASCII
/// case-insensitively, without assuming anything about the tail bytes.
fn split_device_path(device: &str) -> Option<(u32, &str)> {
    let head = device.get(..DEVICE_PREFIX.len())?;
    if !head.eq_ignore_ascii_case(DEVICE_PREFIX) {
        return None;
    }
    let tail = &device[DEVICE_PREFIX.len()..];
    let digits_len = tail.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits_len == 0 {
        return None;
    }
    let volume = tail[..digits_len].parse().ok()?;
    Some((volume, &tail[digits_len..]))
}

fn parse_volume_number(device: &str) -> Option<u32> {
    split_device_path(device).map(|(volume, _)| volume)
}
