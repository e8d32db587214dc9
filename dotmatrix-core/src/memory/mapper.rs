use std::fmt::Formatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MapperType {
    None,
    Mbc1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MapperFeatures {
    pub(crate) has_ram: bool,
    pub(crate) has_battery: bool,
}

impl std::fmt::Display for MapperFeatures {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RAM={}, battery={}",
            self.has_ram, self.has_battery
        )
    }
}

/// Decode the mapper byte at 0x0147 in the cartridge header. Returns None for
/// mapper types this emulator does not implement.
pub(crate) fn parse_byte(mapper_byte: u8) -> Option<(MapperType, MapperFeatures)> {
    let (mapper_type, has_ram, has_battery) = match mapper_byte {
        0x00 => (MapperType::None, false, false),
        0x01 => (MapperType::Mbc1, false, false),
        0x02 => (MapperType::Mbc1, true, false),
        0x03 => (MapperType::Mbc1, true, true),
        _ => return None,
    };

    Some((
        mapper_type,
        MapperFeatures {
            has_ram,
            has_battery,
        },
    ))
}

/// Cartridge banking state. ROM-space writes act as a control plane: they
/// never modify the ROM, they update these registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mapper {
    None,
    Mbc1 {
        // 7-bit bank selector; the low 5 bits can never be zero
        bank_select: u8,
        ram_select: bool,
    },
}

impl Mapper {
    pub(crate) fn new(mapper_type: MapperType) -> Self {
        match mapper_type {
            MapperType::None => Self::None,
            MapperType::Mbc1 => Self::Mbc1 {
                bank_select: 0x01,
                ram_select: false,
            },
        }
    }

    /// Map a 0x0000-0x7FFF bus address to an offset into the ROM image.
    pub(crate) fn map_rom_address(&self, address: u16) -> u32 {
        match self {
            Self::None => address.into(),
            &Self::Mbc1 {
                bank_select,
                ram_select,
            } => match address {
                0x0000..=0x3FFF => address.into(),
                _ => {
                    let bank = if ram_select {
                        bank_select & 0x1F
                    } else {
                        bank_select
                    };
                    (u32::from(bank) << 14) | u32::from(address - 0x4000)
                }
            },
        }
    }

    pub(crate) fn write_rom_address(&mut self, address: u16, value: u8) {
        match self {
            Self::None => {}
            Self::Mbc1 {
                bank_select,
                ram_select,
            } => match address {
                // RAM enable latch; no observable effect
                0x0000..=0x1FFF => {
                    log::trace!("MBC1 RAM enable write: {value:02X}");
                }
                0x2000..=0x3FFF => {
                    let mut low_bits = value & 0x1F;
                    if low_bits == 0x00 {
                        low_bits = 0x01;
                    }
                    *bank_select = (*bank_select & 0x60) | low_bits;
                    log::trace!("MBC1 bank selector changed to {bank_select:02X}");
                }
                0x4000..=0x5FFF => {
                    *bank_select = (*bank_select & 0x1F) | ((value & 0x03) << 5);
                    log::trace!("MBC1 bank selector changed to {bank_select:02X}");
                }
                _ => {
                    *ram_select = value & 0x0A == 0x0A;
                    log::trace!("MBC1 RAM select changed to {ram_select}");
                }
            },
        }
    }

    /// Map a 0xA000-0xBFFF bus address to an offset into cartridge RAM.
    pub(crate) fn map_ram_address(&self, address: u16) -> u32 {
        match self {
            Self::None => u32::from(address - 0xA000),
            &Self::Mbc1 {
                bank_select,
                ram_select,
            } => {
                let bank = if ram_select {
                    (bank_select >> 5) & 0x03
                } else {
                    0
                };
                (u32::from(bank) << 13) | u32::from(address - 0xA000)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mbc1() -> Mapper {
        Mapper::new(MapperType::Mbc1)
    }

    #[test]
    fn rom_bank_zero_promotes_to_one() {
        let mut mapper = mbc1();

        mapper.write_rom_address(0x2000, 0x00);
        assert_eq!(0x4000, mapper.map_rom_address(0x4000));

        mapper.write_rom_address(0x3FFF, 0x20);
        assert_eq!(0x4000, mapper.map_rom_address(0x4000));
    }

    #[test]
    fn rom_bank_selection() {
        let mut mapper = mbc1();

        // Fixed region is unaffected by the selector
        mapper.write_rom_address(0x2000, 0x12);
        assert_eq!(0x0123, mapper.map_rom_address(0x0123));

        assert_eq!(0x12 * 0x4000 + 0x0ABC, mapper.map_rom_address(0x4ABC) as usize);
    }

    #[test]
    fn upper_bank_bits_merge() {
        let mut mapper = mbc1();

        mapper.write_rom_address(0x2000, 0x01);
        mapper.write_rom_address(0x4000, 0x03);
        assert_eq!(0x61 * 0x4000, mapper.map_rom_address(0x4000) as usize);

        // In RAM-select mode only the low 5 bits address ROM
        mapper.write_rom_address(0x6000, 0x0A);
        assert_eq!(0x01 * 0x4000, mapper.map_rom_address(0x4000) as usize);

        // 0x0A must match exactly for the mode latch
        mapper.write_rom_address(0x6000, 0x02);
        assert_eq!(0x61 * 0x4000, mapper.map_rom_address(0x4000) as usize);
    }

    #[test]
    fn ram_banking() {
        let mut mapper = mbc1();

        mapper.write_rom_address(0x4000, 0x03);
        assert_eq!(0x0000, mapper.map_ram_address(0xA000));

        mapper.write_rom_address(0x6000, 0x0A);
        assert_eq!(0x03 * 0x2000, mapper.map_ram_address(0xA000) as usize);
        assert_eq!(0x03 * 0x2000 + 0x1FFF, mapper.map_ram_address(0xBFFF) as usize);
    }
}
