//! System palette and palette-RAM addressing.

/// NES 2C02 64-color palette (0xRRGGBB).
pub const NES_PALETTE_RGB: [u32; 64] = [
    0x666666, 0x002A88, 0x1412A7, 0x3B00A4, 0x5C007E, 0x6E0040, 0x6C0600, 0x561D00, 0x333500,
    0x0B4800, 0x005200, 0x004F08, 0x00404D, 0x000000, 0x000000, 0x000000, 0xADADAD, 0x155FD9,
    0x4240FF, 0x7527FE, 0xA01ACC, 0xB71E7B, 0xB53120, 0x994E00, 0x6B6D00, 0x388700, 0x0C9300,
    0x008F32, 0x007C8D, 0x000000, 0x000000, 0x000000, 0xFFFEFF, 0x64B0FF, 0x9290FF, 0xC676FF,
    0xF36AFF, 0xFE6ECC, 0xFE8170, 0xEA9E22, 0xBCBE00, 0x88D800, 0x5CE430, 0x45E082, 0x48CDDE,
    0x4F4F4F, 0x000000, 0x000000, 0xFFFEFF, 0xC0DFFF, 0xD3D2FF, 0xE8C8FF, 0xFBC2FF, 0xFEC4EA,
    0xFECCC5, 0xF7D8A5, 0xE4E594, 0xCFEF96, 0xBDF4AB, 0xB3F3CC, 0xB5EBF2, 0xB8B8B8, 0x000000,
    0x000000,
];

/// Palette RAM index for a PPU address in $3F00–$3FFF.
/// $3F10/$3F14/$3F18/$3F1C mirror $3F00/$3F04/$3F08/$3F0C.
pub fn palette_index(addr: u16) -> usize {
    let mut i = addr & 0x1F;
    if i & 0x13 == 0x10 {
        i &= 0x0F;
    }
    i as usize
}

/// Color for a palette RAM entry, with PPUMASK grayscale applied.
pub fn resolve(entry: u8, grayscale: bool) -> u32 {
    let index = if grayscale { entry & 0x30 } else { entry };
    NES_PALETTE_RGB[(index & 0x3F) as usize]
}
