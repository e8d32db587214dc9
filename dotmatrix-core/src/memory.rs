pub mod addresses;
pub mod ioregisters;
mod mapper;

use crate::memory::ioregisters::IoRegisters;
use crate::memory::mapper::Mapper;
use std::path::Path;
use std::{fs, io};
use thiserror::Error;

const VRAM_LEN: usize = 8192;
const WORKING_RAM_LEN: usize = 8192;
const OAM_LEN: usize = 160;
const HRAM_LEN: usize = 127;

#[derive(Error, Debug)]
pub enum CartridgeLoadError {
    #[error("header should be at least 336 bytes, was {header_len} bytes")]
    HeaderTooShort { header_len: usize },
    #[error("invalid or unsupported mapper byte in cartridge header: {mapper_byte:02X}")]
    InvalidMapper { mapper_byte: u8 },
    #[error("invalid RAM size code, expected 0x00-0x03: {ram_size_code:02X}")]
    InvalidRamSize { ram_size_code: u8 },
    #[error("error reading data from {file_path}: {source}")]
    FileReadError {
        file_path: String,
        #[source]
        source: io::Error,
    },
}

pub struct Cartridge {
    rom: Vec<u8>,
    mapper: Mapper,
    ram: Vec<u8>,
}

impl Cartridge {
    /// Create a new Cartridge value from the given ROM.
    ///
    /// # `CartridgeLoadError`
    ///
    /// This function will return an error in the following scenarios:
    /// * The ROM is too short (must be at least 0x150 bytes)
    /// * The mapper byte in the cartridge header is invalid (or not implemented)
    /// * The RAM size byte in the cartridge header is invalid
    pub fn new(rom: Vec<u8>) -> Result<Self, CartridgeLoadError> {
        log::info!("Initializing cartridge using {} bytes of data", rom.len());

        if rom.len() < 0x0150 {
            return Err(CartridgeLoadError::HeaderTooShort {
                header_len: rom.len(),
            });
        }

        let mapper_byte = rom[addresses::MAPPER as usize];
        let Some((mapper_type, mapper_features)) = mapper::parse_byte(mapper_byte) else {
            return Err(CartridgeLoadError::InvalidMapper { mapper_byte });
        };

        log::info!("Detected mapper type {mapper_type:?} (byte: {mapper_byte:02X})");
        log::info!("Mapper features: {mapper_features}");

        let ram = if mapper_features.has_ram {
            let ram_size_code = rom[addresses::RAM_SIZE as usize];
            let ram_size: usize = match ram_size_code {
                0x00 => 0,
                0x01 => 2048,  // 2 KB
                0x02 => 8192,  // 8 KB
                0x03 => 32768, // 32 KB
                _ => return Err(CartridgeLoadError::InvalidRamSize { ram_size_code }),
            };
            vec![0; ram_size]
        } else {
            Vec::new()
        };

        log::info!("Cartridge has {} bytes of external RAM", ram.len());

        // Recorded for diagnostics only; CGB rendering is not implemented
        if rom[addresses::CGB_SUPPORT as usize] & 0x80 != 0 {
            log::info!("Cartridge advertises Game Boy Color support");
        }

        Ok(Self {
            rom,
            mapper: Mapper::new(mapper_type),
            ram,
        })
    }

    pub fn from_file(file_path: &str) -> Result<Self, CartridgeLoadError> {
        log::info!("Loading cartridge from '{file_path}'");

        let rom =
            fs::read(Path::new(file_path)).map_err(|err| CartridgeLoadError::FileReadError {
                file_path: file_path.into(),
                source: err,
            })?;

        Self::new(rom)
    }

    /// Read a value from the given ROM address (0x0000-0x7FFF), applying the
    /// current bank mapping.
    pub fn read_rom_address(&self, address: u16) -> u8 {
        let mapped_address = self.mapper.map_rom_address(address);
        self.rom.get(mapped_address as usize).copied().unwrap_or(0xFF)
    }

    /// Write to ROM address space, which updates mapper registers rather than
    /// the (read-only) ROM itself.
    pub fn write_rom_address(&mut self, address: u16, value: u8) {
        self.mapper.write_rom_address(address, value);
    }

    pub fn read_ram_address(&self, address: u16) -> u8 {
        if self.ram.is_empty() {
            log::warn!("cartridge RAM read at {address:04X} but cartridge has no RAM");
            return 0x00;
        }

        let mapped_address = self.mapper.map_ram_address(address);
        self.ram.get(mapped_address as usize).copied().unwrap_or(0x00)
    }

    pub fn write_ram_address(&mut self, address: u16, value: u8) {
        if self.ram.is_empty() {
            log::warn!("cartridge RAM write at {address:04X} but cartridge has no RAM");
            return;
        }

        let mapped_address = self.mapper.map_ram_address(address);
        if let Some(ram_value) = self.ram.get_mut(mapped_address as usize) {
            *ram_value = value;
        }
    }
}

pub struct AddressSpace {
    cartridge: Cartridge,
    vram: [u8; VRAM_LEN],
    working_ram: [u8; WORKING_RAM_LEN],
    oam: [u8; OAM_LEN],
    io_registers: IoRegisters,
    hram: [u8; HRAM_LEN],
}

impl AddressSpace {
    pub fn new(cartridge: Cartridge) -> Self {
        Self {
            cartridge,
            vram: [0; VRAM_LEN],
            working_ram: [0; WORKING_RAM_LEN],
            oam: [0; OAM_LEN],
            io_registers: IoRegisters::new(),
            hram: [0; HRAM_LEN],
        }
    }

    /// Read the byte at the given bus address.
    pub fn read_byte(&self, address: u16) -> u8 {
        match address {
            address @ addresses::ROM_START..=addresses::ROM_END => {
                self.cartridge.read_rom_address(address)
            }
            address @ addresses::VRAM_START..=addresses::VRAM_END => {
                self.vram[(address - addresses::VRAM_START) as usize]
            }
            address @ addresses::EXTERNAL_RAM_START..=addresses::EXTERNAL_RAM_END => {
                self.cartridge.read_ram_address(address)
            }
            address @ addresses::WORKING_RAM_START..=addresses::WORKING_RAM_END => {
                self.working_ram[(address - addresses::WORKING_RAM_START) as usize]
            }
            address @ addresses::ECHO_RAM_START..=addresses::ECHO_RAM_END => {
                self.working_ram[(address - addresses::ECHO_RAM_START) as usize]
            }
            address @ addresses::OAM_START..=addresses::OAM_END => {
                self.oam[(address - addresses::OAM_START) as usize]
            }
            addresses::UNUSABLE_START..=addresses::UNUSABLE_END => 0x00,
            address @ addresses::IO_REGISTERS_START..=addresses::IO_REGISTERS_END => {
                self.io_registers.read_address(address)
            }
            address @ addresses::HRAM_START..=addresses::HRAM_END => {
                self.hram[(address - addresses::HRAM_START) as usize]
            }
            addresses::IE_REGISTER => self.io_registers.read_address(address),
        }
    }

    /// Write the byte at the given bus address, applying I/O side effects.
    pub fn write_byte(&mut self, address: u16, value: u8) {
        match address {
            address @ addresses::ROM_START..=addresses::ROM_END => {
                self.cartridge.write_rom_address(address, value);
            }
            address @ addresses::VRAM_START..=addresses::VRAM_END => {
                self.vram[(address - addresses::VRAM_START) as usize] = value;
            }
            address @ addresses::EXTERNAL_RAM_START..=addresses::EXTERNAL_RAM_END => {
                self.cartridge.write_ram_address(address, value);
            }
            address @ addresses::WORKING_RAM_START..=addresses::WORKING_RAM_END => {
                self.working_ram[(address - addresses::WORKING_RAM_START) as usize] = value;
            }
            address @ addresses::ECHO_RAM_START..=addresses::ECHO_RAM_END => {
                self.working_ram[(address - addresses::ECHO_RAM_START) as usize] = value;
            }
            address @ addresses::OAM_START..=addresses::OAM_END => {
                self.oam[(address - addresses::OAM_START) as usize] = value;
            }
            addresses::UNUSABLE_START..=addresses::UNUSABLE_END => {}
            addresses::DMA_REGISTER => {
                self.run_oam_dma(value);
            }
            address @ addresses::IO_REGISTERS_START..=addresses::IO_REGISTERS_END => {
                self.io_registers.write_address(address, value);
            }
            address @ addresses::HRAM_START..=addresses::HRAM_END => {
                self.hram[(address - addresses::HRAM_START) as usize] = value;
            }
            addresses::IE_REGISTER => {
                self.io_registers.write_address(address, value);
            }
        }
    }

    /// Read a little-endian 16-bit value from the given address and the one
    /// following it.
    pub fn read_word(&self, address: u16) -> u16 {
        let lsb = self.read_byte(address);
        let msb = self.read_byte(address.wrapping_add(1));
        u16::from_le_bytes([lsb, msb])
    }

    /// Write a 16-bit value little-endian: low byte at `address`, high byte
    /// at `address + 1`.
    pub fn write_word(&mut self, address: u16, value: u16) {
        let [lsb, msb] = value.to_le_bytes();
        self.write_byte(address, lsb);
        self.write_byte(address.wrapping_add(1), msb);
    }

    // OAM DMA: copy 0xA0 bytes from (value << 8) into OAM. The real transfer
    // takes 160 machine cycles; performing it instantaneously is compatible
    // with commercial ROMs, which spin in HRAM for the duration anyway.
    fn run_oam_dma(&mut self, source_page: u8) {
        self.io_registers
            .privileged_write(ioregisters::IoRegister::DMA, source_page);

        let source = u16::from_be_bytes([source_page, 0x00]);
        for i in 0..OAM_LEN as u16 {
            self.oam[i as usize] = self.read_byte(source + i);
        }
    }

    pub fn io_registers(&self) -> &IoRegisters {
        &self.io_registers
    }

    pub fn io_registers_mut(&mut self) -> &mut IoRegisters {
        &mut self.io_registers
    }

    /// Video memory, exposed for the PPU's tile and map fetches.
    pub(crate) fn vram(&self) -> &[u8; VRAM_LEN] {
        &self.vram
    }

    /// Sprite attribute table, exposed for the PPU's sprite pass.
    pub(crate) fn oam(&self) -> &[u8; OAM_LEN] {
        &self.oam
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_address_space() -> AddressSpace {
        let rom = vec![0x00; 0x8000];
        AddressSpace::new(Cartridge::new(rom).expect("synthesized test ROM should be valid"))
    }

    #[test]
    fn header_too_short() {
        assert!(matches!(
            Cartridge::new(vec![0x00; 0x100]),
            Err(CartridgeLoadError::HeaderTooShort { header_len: 0x100 })
        ));
    }

    #[test]
    fn invalid_mapper_byte() {
        let mut rom = vec![0x00; 0x150];
        rom[addresses::MAPPER as usize] = 0x05;
        assert!(matches!(
            Cartridge::new(rom),
            Err(CartridgeLoadError::InvalidMapper { mapper_byte: 0x05 })
        ));
    }

    #[test]
    fn invalid_ram_size_code() {
        let mut rom = vec![0x00; 0x150];
        rom[addresses::MAPPER as usize] = 0x02;
        rom[addresses::RAM_SIZE as usize] = 0x04;
        assert!(matches!(
            Cartridge::new(rom),
            Err(CartridgeLoadError::InvalidRamSize {
                ram_size_code: 0x04
            })
        ));
    }

    #[test]
    fn basic_cartridge_ignores_rom_writes_and_has_no_ram() {
        let mut rom = vec![0x00; 0x8000];
        rom[0x4000] = 0x5A;
        let mut address_space = AddressSpace::new(Cartridge::new(rom).unwrap());

        address_space.write_byte(0x2000, 0x07);
        assert_eq!(0x5A, address_space.read_byte(0x4000));

        address_space.write_byte(0xA000, 0x12);
        assert_eq!(0x00, address_space.read_byte(0xA000));
    }

    #[test]
    fn mbc1_cartridge_ram_round_trip() {
        let mut rom = vec![0x00; 0x8000];
        rom[addresses::MAPPER as usize] = 0x02;
        rom[addresses::RAM_SIZE as usize] = 0x03;
        let mut address_space = AddressSpace::new(Cartridge::new(rom).unwrap());

        address_space.write_byte(0xA123, 0xCD);
        assert_eq!(0xCD, address_space.read_byte(0xA123));

        // Switch to RAM bank 2 and verify the banks are distinct
        address_space.write_byte(0x4000, 0x02);
        address_space.write_byte(0x6000, 0x0A);
        assert_eq!(0x00, address_space.read_byte(0xA123));
        address_space.write_byte(0xA123, 0x44);

        address_space.write_byte(0x6000, 0x00);
        assert_eq!(0xCD, address_space.read_byte(0xA123));
    }

    #[test]
    fn mbc1_bank_switch_through_bus() {
        let mut rom = vec![0x00; 0x4000 * 4];
        rom[addresses::MAPPER as usize] = 0x01;
        rom[0x4000] = 0x11;
        rom[0x8000] = 0x22;
        rom[0xC000] = 0x33;
        let mut address_space = AddressSpace::new(Cartridge::new(rom).unwrap());

        // Bank selector of zero behaves as bank 1
        address_space.write_byte(0x2000, 0x00);
        assert_eq!(0x11, address_space.read_byte(0x4000));

        address_space.write_byte(0x2000, 0x02);
        assert_eq!(0x22, address_space.read_byte(0x4000));

        address_space.write_byte(0x2000, 0x03);
        assert_eq!(0x33, address_space.read_byte(0x4000));
    }

    #[test]
    fn echo_ram_mirrors_working_ram() {
        let mut address_space = test_address_space();

        address_space.write_byte(0xC123, 0xAB);
        assert_eq!(0xAB, address_space.read_byte(0xE123));

        address_space.write_byte(0xF000, 0x55);
        assert_eq!(0x55, address_space.read_byte(0xD000));
    }

    #[test]
    fn unusable_region_reads_zero() {
        let mut address_space = test_address_space();

        address_space.write_byte(0xFEA5, 0xFF);
        assert_eq!(0x00, address_space.read_byte(0xFEA5));
    }

    #[test]
    fn word_access_is_little_endian() {
        let mut address_space = test_address_space();

        address_space.write_word(0xC200, 0x1234);
        assert_eq!(0x34, address_space.read_byte(0xC200));
        assert_eq!(0x12, address_space.read_byte(0xC201));
        assert_eq!(0x1234, address_space.read_word(0xC200));
    }

    #[test]
    fn oam_dma_copies_full_block() {
        let mut address_space = test_address_space();

        for i in 0..0xA0_u16 {
            address_space.write_byte(0xC000 + i, i as u8);
        }
        address_space.write_byte(addresses::DMA_REGISTER, 0xC0);

        for i in 0..0xA0_u16 {
            assert_eq!(i as u8, address_space.read_byte(0xFE00 + i));
        }
        assert_eq!(0xC0, address_space.read_byte(addresses::DMA_REGISTER));
    }

    #[test]
    fn div_write_reads_back_zero() {
        let mut address_space = test_address_space();

        for value in [0x00, 0x46, 0xFF] {
            address_space.write_byte(addresses::DIV_REGISTER, value);
            assert_eq!(0x00, address_space.read_byte(addresses::DIV_REGISTER));
        }
    }

    #[test]
    fn hram_round_trip() {
        let mut address_space = test_address_space();

        address_space.write_byte(0xFF80, 0x77);
        address_space.write_byte(0xFFFE, 0x88);
        assert_eq!(0x77, address_space.read_byte(0xFF80));
        assert_eq!(0x88, address_space.read_byte(0xFFFE));
    }
}
