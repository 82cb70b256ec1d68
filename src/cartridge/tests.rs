use crate::{
    cartridge::{
        cartridge::Cartridge,
        header::RomHeader,
        mapper::{MapperVariant, Mirroring},
    },
    error::RomError,
};

/// iNES image whose PRG bytes hold their 8 KiB chunk index and CHR bytes their 1 KiB chunk index.
fn image(mapper: u8, prg_units: u8, chr_units: u8) -> Vec<u8> {
    let mut data = vec![
        b'N',
        b'E',
        b'S',
        0x1A,
        prg_units,
        chr_units,
        mapper << 4,
        mapper & 0xF0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
        0,
    ];
    for i in 0..prg_units as usize * 16 * 1024 {
        data.push((i / 0x2000) as u8);
    }
    for i in 0..chr_units as usize * 8 * 1024 {
        data.push((i / 0x400) as u8);
    }
    data
}

fn mmc1_write(cart: &mut Cartridge, addr: u16, value: u8) {
    for bit in 0..5 {
        cart.cpu_write(addr, (value >> bit) & 1);
    }
}

#[test]
fn nrom_reads_first_prg_byte() {
    let mut data = image(0, 1, 1);
    data[16] = 0xA5;

    let cart = Cartridge::from_bytes(&data).unwrap();

    assert_eq!(cart.cpu_read(0x8000), 0xA5);
    // 16 KiB PRG is mirrored into $C000–$FFFF.
    assert_eq!(cart.cpu_read(0xC000), 0xA5);
    assert_eq!(cart.mapper_number(), 0);
}

#[test]
fn truncated_image_is_rejected() {
    let mut data = image(0, 1, 1);
    data[4] = 2;

    match Cartridge::from_bytes(&data) {
        Err(RomError::Truncated { expected, actual }) => {
            assert_eq!(expected, 16 + 32 * 1024 + 8 * 1024);
            assert_eq!(actual, data.len());
        }
        Err(e) => panic!("wrong error: {e}"),
        Ok(_) => panic!("truncated image accepted"),
    }
}

#[test]
fn short_or_unmarked_images_are_rejected() {
    assert!(matches!(
        Cartridge::from_bytes(&[b'N', b'E', b'S']),
        Err(RomError::TooShort(3))
    ));

    let mut data = image(0, 1, 1);
    data[3] = 0x00;
    assert!(matches!(Cartridge::from_bytes(&data), Err(RomError::BadMagic)));

    let data = image(0, 0, 1);
    assert!(matches!(Cartridge::from_bytes(&data), Err(RomError::NoPrgRom)));
}

#[test]
fn unknown_mapper_is_a_distinct_error() {
    let data = image(7, 1, 1);
    assert!(matches!(
        Cartridge::from_bytes(&data),
        Err(RomError::UnsupportedMapper(7))
    ));
}

#[test]
fn header_splits_mapper_number_across_nibbles() {
    let mut data = image(0, 1, 1);
    data[6] = 0x2B; // low nibble 2, flags: vertical, battery, four-screen
    data[7] = 0x40;

    let header = RomHeader::parse(&data).unwrap();

    assert_eq!(header.mapper, 0x42);
    assert!(header.vertical_mirroring);
    assert!(header.battery);
    assert!(!header.trainer);
    assert!(header.four_screen);
}

#[test]
fn trainer_is_skipped() {
    let mut data = image(0, 1, 1);
    data[6] |= 0x04;
    let mut with_trainer = data[..16].to_vec();
    with_trainer.extend(std::iter::repeat_n(0xEE, 512));
    with_trainer.extend_from_slice(&data[16..]);
    with_trainer[16 + 512] = 0x42;

    let cart = Cartridge::from_bytes(&with_trainer).unwrap();

    assert_eq!(cart.cpu_read(0x8000), 0x42);
}

#[test]
fn chr_ram_is_writable_and_chr_rom_is_not() {
    let mut ram_cart = Cartridge::from_bytes(&image(0, 1, 0)).unwrap();
    ram_cart.ppu_write(0x0123, 0x77);
    assert_eq!(ram_cart.ppu_read(0x0123), 0x77);

    let mut rom_cart = Cartridge::from_bytes(&image(0, 1, 1)).unwrap();
    rom_cart.ppu_write(0x0123, 0x77);
    assert_eq!(rom_cart.ppu_read(0x0123), 0x00);
}

#[test]
fn header_mirroring_and_four_screen_override() {
    let mut data = image(0, 1, 1);
    data[6] |= 0x01;
    assert_eq!(
        Cartridge::from_bytes(&data).unwrap().mirroring(),
        Mirroring::Vertical
    );

    data[6] |= 0x08;
    assert_eq!(
        Cartridge::from_bytes(&data).unwrap().mirroring(),
        Mirroring::FourScreen
    );
}

#[test]
fn uxrom_switches_low_bank_and_fixes_last() {
    let mut cart = Cartridge::from_bytes(&image(2, 4, 0)).unwrap();

    cart.cpu_write(0x8000, 2);
    assert_eq!(cart.cpu_read(0x8000), 4);
    assert_eq!(cart.cpu_read(0xC000), 6);
    assert_eq!(cart.cpu_read(0xFFFF), 7);

    // 4 banks: raw value wraps by masking.
    cart.cpu_write(0x8000, 0xFF);
    assert_eq!(cart.cpu_read(0x8000), 6);
}

#[test]
fn cnrom_switches_chr_bank() {
    let mut cart = Cartridge::from_bytes(&image(3, 1, 4)).unwrap();

    cart.cpu_write(0x8000, 1);
    assert_eq!(cart.ppu_read(0x0000), 8);
    assert_eq!(cart.ppu_read(0x1FFF), 15);

    cart.cpu_write(0x8000, 0x07);
    assert_eq!(cart.ppu_read(0x0000), 24);
}

#[test]
fn mmc1_five_writes_latch_exactly_one_register() {
    let mut cart = Cartridge::from_bytes(&image(1, 8, 2)).unwrap();
    let before = match cart.mapper() {
        MapperVariant::Mmc1(m) => m.registers(),
        _ => unreachable!(),
    };

    mmc1_write(&mut cart, 0xE000, 0b00011);

    let MapperVariant::Mmc1(m) = cart.mapper() else {
        unreachable!()
    };
    let after = m.registers();
    assert_eq!(after[3], 0b00011);
    assert_eq!(before[..3], after[..3]);
    assert_eq!(m.pending_writes(), 0);

    // Address bits 13–14 of the fifth write choose the register.
    mmc1_write(&mut cart, 0xA000, 0b10101);
    let MapperVariant::Mmc1(m) = cart.mapper() else {
        unreachable!()
    };
    assert_eq!(m.registers()[1], 0b10101);
    assert_eq!(m.registers()[2], 0);
}

#[test]
fn mmc1_bit7_write_resets_shift_register() {
    let mut cart = Cartridge::from_bytes(&image(1, 8, 2)).unwrap();

    mmc1_write(&mut cart, 0x8000, 0b00000);
    cart.cpu_write(0x8000, 1);
    cart.cpu_write(0x8000, 1);
    cart.cpu_write(0x8000, 0x80);

    let MapperVariant::Mmc1(m) = cart.mapper() else {
        unreachable!()
    };
    assert_eq!(m.pending_writes(), 0);
    assert_eq!(m.registers()[0] & 0x0C, 0x0C);
}

#[test]
fn mmc1_prg_modes() {
    let mut cart = Cartridge::from_bytes(&image(1, 8, 2)).unwrap();

    // Power-on mode 3: switchable $8000, last bank at $C000.
    mmc1_write(&mut cart, 0xE000, 2);
    assert_eq!(cart.cpu_read(0x8000), 4);
    assert_eq!(cart.cpu_read(0xC000), 14);

    // Mode 2: first bank fixed at $8000.
    mmc1_write(&mut cart, 0x8000, 0b01000);
    assert_eq!(cart.cpu_read(0x8000), 0);
    assert_eq!(cart.cpu_read(0xC000), 4);

    // 32 KiB mode ignores the low bit.
    mmc1_write(&mut cart, 0x8000, 0b00000);
    mmc1_write(&mut cart, 0xE000, 3);
    assert_eq!(cart.cpu_read(0x8000), 4);
    assert_eq!(cart.cpu_read(0xE000), 7);
}

#[test]
fn mmc1_control_sets_mirroring_and_chr_mode() {
    let mut cart = Cartridge::from_bytes(&image(1, 2, 4)).unwrap();

    mmc1_write(&mut cart, 0x8000, 0b10010);
    assert_eq!(cart.mirroring(), Mirroring::Vertical);

    mmc1_write(&mut cart, 0xA000, 3);
    mmc1_write(&mut cart, 0xC000, 5);
    assert_eq!(cart.ppu_read(0x0000), 12);
    assert_eq!(cart.ppu_read(0x1000), 20);

    mmc1_write(&mut cart, 0x8000, 0b00001);
    assert_eq!(cart.mirroring(), Mirroring::OneScreenUpper);
    // 8 KiB mode: CHR bank 0 with the low bit dropped.
    assert_eq!(cart.ppu_read(0x0000), 8);
}

#[test]
fn mmc1_prg_ram() {
    let mut cart = Cartridge::from_bytes(&image(1, 2, 1)).unwrap();
    cart.cpu_write(0x6010, 0x99);
    assert_eq!(cart.cpu_read(0x6010), 0x99);
}

#[test]
fn mmc3_prg_banking_modes() {
    let mut cart = Cartridge::from_bytes(&image(4, 8, 8)).unwrap();

    cart.cpu_write(0x8000, 6);
    cart.cpu_write(0x8001, 3);
    cart.cpu_write(0x8000, 7);
    cart.cpu_write(0x8001, 5);

    assert_eq!(cart.cpu_read(0x8000), 3);
    assert_eq!(cart.cpu_read(0xA000), 5);
    assert_eq!(cart.cpu_read(0xC000), 14);
    assert_eq!(cart.cpu_read(0xE000), 15);

    cart.cpu_write(0x8000, 0x40);
    assert_eq!(cart.cpu_read(0x8000), 14);
    assert_eq!(cart.cpu_read(0xC000), 3);
}

#[test]
fn mmc3_chr_inversion() {
    let mut cart = Cartridge::from_bytes(&image(4, 2, 8)).unwrap();

    cart.cpu_write(0x8000, 0);
    cart.cpu_write(0x8001, 10);
    cart.cpu_write(0x8000, 2);
    cart.cpu_write(0x8001, 33);

    assert_eq!(cart.ppu_read(0x0000), 10);
    assert_eq!(cart.ppu_read(0x0400), 11);
    assert_eq!(cart.ppu_read(0x1000), 33);

    cart.cpu_write(0x8000, 0x80);
    assert_eq!(cart.ppu_read(0x1000), 10);
    assert_eq!(cart.ppu_read(0x0000), 33);
}

#[test]
fn mmc3_mirroring_register() {
    let mut cart = Cartridge::from_bytes(&image(4, 2, 1)).unwrap();
    cart.cpu_write(0xA000, 1);
    assert_eq!(cart.mirroring(), Mirroring::Horizontal);
    cart.cpu_write(0xA000, 0);
    assert_eq!(cart.mirroring(), Mirroring::Vertical);
}

#[test]
fn mmc3_scanline_counter_reloads_and_raises_irq() {
    let mut cart = Cartridge::from_bytes(&image(4, 2, 1)).unwrap();
    cart.cpu_write(0xC000, 2);
    cart.cpu_write(0xC001, 0);
    cart.cpu_write(0xE001, 0);

    let counter = |cart: &Cartridge| match cart.mapper() {
        MapperVariant::Mmc3(m) => m.irq_counter(),
        _ => unreachable!(),
    };

    cart.scanline_counter();
    assert_eq!(counter(&cart), 2);
    assert!(!cart.irq_pending());

    cart.scanline_counter();
    assert_eq!(counter(&cart), 1);
    assert!(!cart.irq_pending());

    cart.scanline_counter();
    assert_eq!(counter(&cart), 0);
    assert!(cart.irq_pending());

    cart.acknowledge_irq();
    assert!(!cart.irq_pending());

    // Counter at zero reloads from the latch on the next clock.
    cart.scanline_counter();
    assert_eq!(counter(&cart), 2);
}

#[test]
fn mmc3_disabled_irq_never_pends() {
    let mut cart = Cartridge::from_bytes(&image(4, 2, 1)).unwrap();
    cart.cpu_write(0xC000, 1);
    cart.cpu_write(0xC001, 0);
    cart.cpu_write(0xE000, 0);

    for _ in 0..4 {
        cart.scanline_counter();
    }
    assert!(!cart.irq_pending());
}

#[test]
fn bank_indices_stay_in_range_for_every_register_value() {
    let mut mmc3 = Cartridge::from_bytes(&image(4, 8, 8)).unwrap();
    let mut uxrom = Cartridge::from_bytes(&image(2, 8, 0)).unwrap();
    let mut cnrom = Cartridge::from_bytes(&image(3, 1, 2)).unwrap();

    for raw in 0..=255u8 {
        mmc3.cpu_write(0x8000, 6);
        mmc3.cpu_write(0x8001, raw);
        assert_eq!(mmc3.cpu_read(0x8000), raw & 15);

        mmc3.cpu_write(0x8000, 2);
        mmc3.cpu_write(0x8001, raw);
        assert_eq!(mmc3.ppu_read(0x1000), raw & 63);

        uxrom.cpu_write(0x8000, raw);
        assert_eq!(uxrom.cpu_read(0x8000), (raw & 7) * 2);

        cnrom.cpu_write(0x8000, raw);
        assert_eq!(cnrom.ppu_read(0x0000), (raw & 1) * 8);
    }
}
