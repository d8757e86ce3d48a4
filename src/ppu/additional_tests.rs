use super::*;
use proptest::prelude::*;

fn oam_from_ys(ys: &[u8]) -> Oam {
    let mut oam = Oam::new();
    for (index, y) in ys.iter().enumerate() {
        oam.set_entry(index as u8, OamEntry { y: *y, tile: index as u8, attributes: 0, x: 0 });
    }
    oam
}

fn reverse_nibbles(value: u32) -> u32 {
    (0..8).fold(0, |acc, i| (acc << 4) | ((value >> (i * 4)) & 0x0F))
}

proptest! {
    #[test]
    fn shift_moves_one_nibble(high in any::<u32>(), low in any::<u32>()) {
        let mut tile = BackgroundTileRegister::new();
        tile.set_high32(high);
        tile.set_low32(low);

        tile.shift_left4();

        prop_assert_eq!(tile.high32(), (high << 4) | (low >> 28));
        prop_assert_eq!(tile.low32(), low << 4);
    }

    #[test]
    fn eight_shifts_replace_high_with_low(high in any::<u32>(), low in any::<u32>()) {
        let mut tile = BackgroundTileRegister::new();
        tile.set_high32(high);
        tile.set_low32(low);

        for _ in 0..8 {
            tile.shift_left4();
        }

        prop_assert_eq!(tile.high32(), low);
        prop_assert_eq!(tile.low32(), 0);
    }

    #[test]
    fn pixel_edges_match_high_register(high in any::<u32>(), fine_x in 0u8..8) {
        let mut tile = BackgroundTileRegister::new();
        tile.set_high32(high);

        prop_assert_eq!(tile.pixel(0) as u32, (high >> 28) & 0x0F);
        prop_assert_eq!(tile.pixel(7) as u32, high & 0x0F);
        prop_assert_eq!(tile.pixel(fine_x) as u32, (high >> ((7 - fine_x as u32) * 4)) & 0x0F);
    }

    #[test]
    fn evaluation_count_and_overflow_follow_in_range_entries(
        ys in proptest::collection::vec(any::<u8>(), 64),
        scanline in 0u32..262,
        large in any::<bool>(),
    ) {
        let oam = oam_from_ys(&ys);
        let height = if large { 16 } else { 8 };
        let expected: Vec<u8> = ys
            .iter()
            .enumerate()
            .filter(|(_, y)| scanline.wrapping_sub(**y as u32) < height)
            .map(|(index, _)| index as u8)
            .collect();

        let mut evaluator = SpriteEvaluator::new();
        let result = evaluator.evaluate_scanline(&oam, &NullPatternMemory, large, 0x0000, scanline);

        prop_assert!(result.sprite_count as usize <= MAX_SPRITES_PER_SCANLINE);
        prop_assert_eq!(result.overflow, expected.len() > MAX_SPRITES_PER_SCANLINE);
        prop_assert_eq!(result.sprite_count as usize, expected.len().min(MAX_SPRITES_PER_SCANLINE));

        let selected: Vec<u8> = evaluator.active_slots().iter().map(|slot| slot.oam_index).collect();
        prop_assert_eq!(&selected[..], &expected[..result.sprite_count as usize]);
    }

    #[test]
    fn horizontal_flip_reverses_pixel_order(low in any::<u8>(), high in any::<u8>(), palette in 0u8..4) {
        let plain = pack_tile_row(low, high, palette, false);
        let mirrored = pack_tile_row(low, high, palette, true);

        prop_assert_eq!(mirrored, reverse_nibbles(plain));
    }

    #[test]
    fn fetch_uses_both_planes(low in any::<u8>(), high in any::<u8>(), attributes in any::<u8>(), tile in any::<u8>()) {
        let mut memory = VideoMemory::new();
        let address = sprite_pattern_address(tile, attributes, 0, false, 0x1000);
        memory.write(address, low);
        memory.write(address + 8, high);

        let mut oam = Oam::new();
        oam.set_entry(0, OamEntry { y: 0, tile, attributes, x: 0 });

        let fetched = fetch_sprite_pattern(&oam, &memory, 0, 0, false, 0x1000);
        let expected = pack_tile_row(low, high, attributes & 0x03, attributes & 0x40 != 0);
        prop_assert_eq!(fetched, expected);
    }

    #[test]
    fn vertical_flip_8x8_mirrors_row(tile in any::<u8>(), row in 0u32..8, base in prop_oneof![Just(0x0000u16), Just(0x1000u16)]) {
        prop_assert_eq!(
            sprite_pattern_address(tile, 0x80, row, false, base),
            sprite_pattern_address(tile, 0x00, 7 - row, false, base)
        );
    }

    #[test]
    fn tall_sprite_rows_split_across_tile_pair(tile in any::<u8>(), row in 0u32..16) {
        let table = (tile as u16 & 1) * 0x1000;
        let top = (tile & 0xFE) as u16;
        let expected = if row < 8 {
            table + top * 16 + row as u16
        } else {
            table + (top + 1) * 16 + (row as u16 - 8)
        };

        prop_assert_eq!(sprite_pattern_address(tile, 0x00, row, true, 0x0000), expected);
        prop_assert_eq!(sprite_pattern_address(tile, 0x00, row, true, 0x1000), expected);
    }
}
