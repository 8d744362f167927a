//! Builders for synthetic NSO modules used across the test suites

use crate::build_id::BuildId;
use crate::nso::HEADER_SIZE;

pub struct NsoSpec {
    pub build_id: [u8; 32],
    pub rodata: Vec<u8>,
    pub compress: bool,
}

impl NsoSpec {
    /// Module whose build id starts with `seed` repeated four times.
    pub fn new(seed: u8, rodata: Vec<u8>) -> Self {
        let mut build_id = [0x5au8; 32];
        build_id[..4].fill(seed);
        Self {
            build_id,
            rodata,
            compress: true,
        }
    }

    pub fn build_id(&self) -> BuildId {
        BuildId(self.build_id)
    }
}

/// Read-only segment with a module path record and an optional build string.
pub fn rodata(name: &str, build_string: Option<&str>) -> Vec<u8> {
    let mut ro = Vec::new();
    ro.extend_from_slice(&0u32.to_le_bytes());
    ro.extend_from_slice(&(name.len() as u32).to_le_bytes());
    ro.extend_from_slice(name.as_bytes());
    ro.push(0);
    ro.extend_from_slice(&[0u8; 24]);
    ro.extend_from_slice(b"unrelated text\0");
    if let Some(build) = build_string {
        ro.extend_from_slice(build.as_bytes());
        ro.push(0);
    }
    ro.extend_from_slice(&[0u8; 16]);
    ro
}

/// Serialize a complete NSO file.
pub fn build_nso(spec: &NsoSpec) -> Vec<u8> {
    let text = b"TEXTTEXTTEXTTEXT".to_vec();
    let data = b"DATADATADATADATA".to_vec();
    let ro_stored = if spec.compress {
        lz4_flex::block::compress(&spec.rodata)
    } else {
        spec.rodata.clone()
    };

    let text_offset = HEADER_SIZE as u32;
    let ro_offset = text_offset + text.len() as u32;
    let data_offset = ro_offset + ro_stored.len() as u32;

    let mut out = vec![0u8; HEADER_SIZE];
    out[0..4].copy_from_slice(b"NSO0");
    let flags: u32 = if spec.compress { 1 << 1 } else { 0 };
    out[0x0c..0x10].copy_from_slice(&flags.to_le_bytes());

    let mut put = |offset: usize, value: u32| {
        out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    };
    put(0x10, text_offset);
    put(0x14, 0);
    put(0x18, text.len() as u32);
    put(0x20, ro_offset);
    put(0x24, 0x1000);
    put(0x28, spec.rodata.len() as u32);
    put(0x30, data_offset);
    put(0x34, 0x2000);
    put(0x38, data.len() as u32);
    put(0x3c, 0x100);
    put(0x60, text.len() as u32);
    put(0x64, ro_stored.len() as u32);
    put(0x68, data.len() as u32);

    out[0x40..0x60].copy_from_slice(&spec.build_id);
    out.extend_from_slice(&text);
    out.extend_from_slice(&ro_stored);
    out.extend_from_slice(&data);
    out
}

/// Shorthand for a compressed module with the given name and build string.
pub fn nso(seed: u8, name: &str, build_string: Option<&str>) -> Vec<u8> {
    build_nso(&NsoSpec::new(seed, rodata(name, build_string)))
}
