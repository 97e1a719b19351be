// SPDX-License-Identifier: MIT

//! Known partition type GUIDs and their display names.

use std::collections::HashMap;

use gptcore::Guid;
use uuid::Uuid;

/// Defines the known partition types.
///
/// For each `NAME => "description", "canonical-guid"` this generates a
/// `TYPE_<NAME>` constant holding the canonical string and a
/// `PartitionKind` variant, plus `PartitionKind::ALL` and accessors for the
/// canonical GUID and description. Requires `paste`.
macro_rules! define_partition_types {
    (
        $(
            $name:ident => $desc:expr, $guid:literal
        ),+ $(,)?
    ) => {
        paste::paste! {
            $(
                #[doc = $desc]
                #[allow(dead_code)]
                pub const [<TYPE_ $name:upper>]: &str = $guid;
            )+

            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum PartitionKind {
                $([<$name:camel>],)+
            }

            impl PartitionKind {
                pub const ALL: &'static [PartitionKind] = &[$(PartitionKind::[<$name:camel>],)+];

                pub fn canonical(&self) -> &'static str {
                    match self {
                        $(Self::[<$name:camel>] => [<TYPE_ $name:upper>],)+
                    }
                }

                pub fn description(&self) -> &'static str {
                    match self {
                        $(Self::[<$name:camel>] => $desc,)+
                    }
                }
            }

            impl core::fmt::Display for PartitionKind {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    f.write_str(self.description())
                }
            }
        }
    };
}

define_partition_types! {
    EFI_SYSTEM => "EFI System Partition", "c12a7328-f81f-11d2-ba4b-00a0c93ec93b",
    BIOS_BOOT => "BIOS Boot Partition", "21686148-6449-6e6f-744e-656564454649",
    MBR_SCHEME => "MBR partition scheme", "024dee41-33e7-11d3-9d69-0008c781f39f",
    LINUX_FS => "Linux filesystem data", "0fc63daf-8483-4772-8e79-3d69d8477de4",
    LINUX_SWAP => "Linux swap", "0657fd6d-a4ab-43c4-84e5-0933c84b4f4f",
    LINUX_LVM => "Linux LVM", "e6d6d379-f507-44c2-a23c-238f2a3df928",
    LINUX_RAID => "Linux RAID", "a19d880f-05fc-4d3b-a006-743f0f84911e",
    LINUX_HOME => "Linux /home", "933ac7e1-2eb4-4f13-b844-0e14e2aef915",
    LINUX_SRV => "Linux /srv", "3b8f8425-20e0-4f3b-907f-1a25a76f98e8",
    LINUX_ROOT_X86_64 => "Linux root (x86-64)", "4f68bce3-e8cd-4db1-96e7-fbcaf984b709",
    LINUX_ROOT_AARCH64 => "Linux root (AArch64)", "b921b045-1df0-41c3-af44-4c6f280d3fae",
    LINUX_XBOOTLDR => "Linux extended boot (/boot)", "bc13c2ff-59e6-4262-a352-b275fd6f7172",
    LINUX_RESERVED => "Linux reserved", "8da63339-0007-60c0-c436-083ac8230908",
    MS_RESERVED => "Microsoft Reserved Partition (MSR)", "e3c9e316-0b5c-4db8-817d-f92df00215ae",
    MS_BASIC_DATA => "Microsoft Basic Data", "ebd0a0a2-b9e5-4433-87c0-68b6b72699c7",
    MS_RECOVERY => "Windows Recovery Environment", "de94bba4-06d1-4d40-a16a-bfd50179d6ac",
    MS_LDM_METADATA => "Windows LDM metadata", "5808c8aa-7e8f-42e0-85d2-e1e90434cfb3",
    MS_LDM_DATA => "Windows LDM data", "af9b60a0-1431-4f62-bc68-3311714a69ad",
    CHROMEOS_KERNEL => "ChromeOS kernel", "fe3a2a5d-4f32-41a7-b725-accc3285a309",
    CHROMEOS_ROOTFS => "ChromeOS rootfs", "3cb8e202-3b7e-47dd-8a3c-7ff2a13cfcec",
    APPLE_HFS => "Apple HFS+", "48465300-0000-11aa-aa11-00306543ecac",
    APPLE_APFS => "Apple APFS container", "7c3457ef-0000-11aa-aa11-00306543ecac",
    FREEBSD_BOOT => "FreeBSD boot", "83bd6b9d-7f41-11dc-be0b-001560b84f0f",
    FREEBSD_SWAP => "FreeBSD swap", "516e7cb5-6ecf-11d6-8ff8-00022d09712b",
    FREEBSD_UFS => "FreeBSD UFS", "516e7cb6-6ecf-11d6-8ff8-00022d09712b",
    FREEBSD_ZFS => "FreeBSD ZFS", "516e7cba-6ecf-11d6-8ff8-00022d09712b",
    SOLARIS_USR => "Solaris /usr or Apple ZFS", "6a898cc3-1dd2-11b2-99a6-080020736631",
}

/// Lookup from on-disk type GUID to kind. Built once, then only read.
#[derive(Debug, Clone)]
pub struct TypeNames {
    by_guid: HashMap<Guid, PartitionKind>,
}

impl TypeNames {
    pub fn builtin() -> Self {
        let by_guid = PartitionKind::ALL
            .iter()
            .filter_map(|&kind| {
                let uuid = Uuid::parse_str(kind.canonical()).ok()?;
                Some((Guid(uuid.to_bytes_le()), kind))
            })
            .collect();
        Self { by_guid }
    }

    pub fn lookup(&self, guid: &Guid) -> Option<PartitionKind> {
        self.by_guid.get(guid).copied()
    }

    pub fn name(&self, guid: &Guid) -> &'static str {
        self.lookup(guid)
            .map_or("<unknown>", |kind| kind.description())
    }

    pub fn len(&self) -> usize {
        self.by_guid.len()
    }
}
