pub const OAM_SIZE: usize = 256;
pub const OAM_SPRITES: usize = 64;
pub const VIDEO_ADDRESS_SPACE: usize = 0x4000;

/// Read side of the PPU bus as seen by the pixel pipeline.
///
/// Reads must be side-effect free: the pipeline may fetch the same
/// address more than once per scanline.
pub trait PatternMemory {
    /// Pattern table byte ($0000-$1FFF).
    fn read_pattern_byte(&self, address: u16) -> u8;

    /// Nametable/attribute byte ($2000-$2FFF).
    fn read_nametable_byte(&self, address: u16) -> u8 {
        self.read_pattern_byte(address)
    }
}

/// Open bus stand-in: every pattern fetch reads zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPatternMemory;

impl PatternMemory for NullPatternMemory {
    fn read_pattern_byte(&self, _address: u16) -> u8 {
        0
    }
}

/// Flat 16 KiB PPU address space, mirrored every $4000.
#[derive(Debug, Clone)]
pub struct VideoMemory {
    bytes: Vec<u8>,
}

impl VideoMemory {
    pub fn new() -> Self {
        Self {
            bytes: vec![0; VIDEO_ADDRESS_SPACE],
        }
    }

    /// Builds memory with `chr` mapped at $0000. At most 8 KiB is used.
    pub fn with_chr(chr: &[u8]) -> Result<Self, String> {
        if chr.is_empty() {
            return Err("CHR data is empty".to_string());
        }
        if chr.len() > 0x2000 {
            return Err(format!(
                "CHR data is {} bytes, expected at most 8192",
                chr.len()
            ));
        }
        let mut memory = Self::new();
        memory.bytes[..chr.len()].copy_from_slice(chr);
        Ok(memory)
    }

    pub fn read(&self, address: u16) -> u8 {
        self.bytes[address as usize % VIDEO_ADDRESS_SPACE]
    }

    pub fn write(&mut self, address: u16, value: u8) {
        self.bytes[address as usize % VIDEO_ADDRESS_SPACE] = value;
    }
}

impl Default for VideoMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMemory for VideoMemory {
    fn read_pattern_byte(&self, address: u16) -> u8 {
        self.read(address)
    }
}

/// One decoded OAM entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OamEntry {
    pub y: u8,
    pub tile: u8,
    pub attributes: u8,
    pub x: u8,
}

impl OamEntry {
    pub fn horizontal_flip(&self) -> bool {
        self.attributes & 0x40 != 0
    }

    pub fn behind_background(&self) -> bool {
        self.attributes & 0x20 != 0
    }

    pub fn palette(&self) -> u8 {
        self.attributes & 0x03
    }
}

/// Object Attribute Memory: 64 sprites x (Y, tile, attributes, X)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oam {
    bytes: [u8; OAM_SIZE],
}

impl Oam {
    pub fn new() -> Self {
        Self {
            bytes: [0xFF; OAM_SIZE], // Y=$FF keeps every sprite off-screen
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        if data.len() != OAM_SIZE {
            return Err(format!(
                "OAM dump is {} bytes, expected {}",
                data.len(),
                OAM_SIZE
            ));
        }
        let mut oam = Self::new();
        oam.bytes.copy_from_slice(data);
        Ok(oam)
    }

    pub fn read(&self, address: u8) -> u8 {
        self.bytes[address as usize]
    }

    pub fn write(&mut self, address: u8, value: u8) {
        self.bytes[address as usize] = value;
    }

    /// Decoded entry for sprite `index`; indices wrap at 64.
    pub fn entry(&self, index: u8) -> OamEntry {
        let base = (index as usize % OAM_SPRITES) * 4;
        OamEntry {
            y: self.bytes[base],
            tile: self.bytes[base + 1],
            attributes: self.bytes[base + 2],
            x: self.bytes[base + 3],
        }
    }

    pub fn set_entry(&mut self, index: u8, entry: OamEntry) {
        let base = (index as usize % OAM_SPRITES) * 4;
        self.bytes[base] = entry.y;
        self.bytes[base + 1] = entry.tile;
        self.bytes[base + 2] = entry.attributes;
        self.bytes[base + 3] = entry.x;
    }
}

impl Default for Oam {
    fn default() -> Self {
        Self::new()
    }
}
