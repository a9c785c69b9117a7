mod txrom;
mod uxrom;
mod vrc3;
mod vrc6;

pub(crate) use txrom::new as txrom;
pub(crate) use uxrom::new as uxrom;
pub(crate) use vrc3::new as vrc3;
pub(crate) use vrc6::new as vrc6;

#[cfg(test)]
mod tests {
    use crate::board::{BoardConfig, Mirroring};
    use crate::dispatch::AddressSpace;
    use crate::instance::MapperInstance;
    use crate::state::{LoadOutcome, Snapshot};

    /// Fills each bank with `bank + 1` so a read identifies which bank a
    /// window resolved to.
    fn patterned_banks(total: usize, bank_size: usize) -> Vec<u8> {
        let mut rom = vec![0; total];
        for (bank, chunk) in rom.chunks_mut(bank_size).enumerate() {
            chunk.fill((bank + 1) as u8);
        }
        rom
    }

    fn make(board_id: u16, prg: Vec<u8>, chr: Vec<u8>, config: &BoardConfig) -> MapperInstance {
        let mut mapper = MapperInstance::construct(board_id, prg, chr, config).expect("construct");
        mapper.power_on();
        mapper
    }

    #[test]
    fn uxrom_switches_prg_and_keeps_last_bank_fixed() {
        let prg = patterned_banks(3 * 0x4000, 0x4000);
        let mut mapper = make(2, prg, vec![], &BoardConfig::default());

        assert_eq!(mapper.read(0x8000), 1);
        assert_eq!(mapper.read(0xC000), 3);

        mapper.write(0x8000, 1);
        assert_eq!(mapper.read(0x8000), 2);
        assert_eq!(mapper.read(0xC000), 3);
    }

    #[test]
    fn uxrom_allocates_writable_chr_when_cartridge_has_none() {
        let prg = patterned_banks(0x8000, 0x4000);
        let mut mapper = make(2, prg, vec![], &BoardConfig::default());

        mapper.chr_write(0x0005, 0x42);
        assert_eq!(mapper.chr_read(0x0005), 0x42);
    }

    #[test]
    fn chr_rom_ignores_writes() {
        let prg = patterned_banks(0x8000, 0x4000);
        let chr = patterned_banks(0x2000, 0x2000);
        let mut mapper = make(2, prg, chr, &BoardConfig::default());

        mapper.chr_write(0x0000, 0x42);
        assert_eq!(mapper.chr_read(0x0000), 1);
    }

    #[test]
    fn unmapped_cpu_reads_return_the_last_bus_value() {
        let prg = patterned_banks(0x8000, 0x4000);
        let mut mapper = make(2, prg, vec![], &BoardConfig::default());

        mapper.write(0x5000, 0x7E);
        assert_eq!(mapper.read(0x5000), 0x7E);

        // Any mapped read refreshes the bus value.
        assert_eq!(mapper.read(0x8000), 1);
        assert_eq!(mapper.read(0x5000), 1);
    }

    #[test]
    fn txrom_prg_layouts_follow_the_select_mode_bit() {
        let prg = patterned_banks(8 * 0x2000, 0x2000);
        let mut mapper = make(4, prg, vec![], &BoardConfig::default());

        mapper.write(0x8000, 6);
        mapper.write(0x8001, 2);
        mapper.write(0x8000, 7);
        mapper.write(0x8001, 3);

        // Mode 0: R6, R7, second-last, last.
        assert_eq!(mapper.read(0x8000), 3);
        assert_eq!(mapper.read(0xA000), 4);
        assert_eq!(mapper.read(0xC000), 7);
        assert_eq!(mapper.read(0xE000), 8);

        // Mode 1 swaps the $8000 and $C000 slots.
        mapper.write(0x8000, 0x40);
        assert_eq!(mapper.read(0x8000), 7);
        assert_eq!(mapper.read(0xA000), 4);
        assert_eq!(mapper.read(0xC000), 3);
        assert_eq!(mapper.read(0xE000), 8);
    }

    #[test]
    fn txrom_chr_layouts_pair_the_low_registers() {
        let prg = patterned_banks(0x8000, 0x2000);
        let chr = patterned_banks(0x4000, 0x400);
        let mut mapper = make(4, prg, chr, &BoardConfig::default());

        for (reg, bank) in [(0u8, 2u8), (1, 4), (2, 8), (3, 9), (4, 10), (5, 11)] {
            mapper.write(0x8000, reg);
            mapper.write(0x8001, bank);
        }

        // Mode 0: R0/R1 as 2 KiB pairs below, R2..R5 as 1 KiB above.
        assert_eq!(mapper.chr_read(0x0000), 3);
        assert_eq!(mapper.chr_read(0x0400), 4);
        assert_eq!(mapper.chr_read(0x0800), 5);
        assert_eq!(mapper.chr_read(0x0C00), 6);
        assert_eq!(mapper.chr_read(0x1000), 9);
        assert_eq!(mapper.chr_read(0x1400), 10);
        assert_eq!(mapper.chr_read(0x1800), 11);
        assert_eq!(mapper.chr_read(0x1C00), 12);

        // Mode 1 swaps the halves.
        mapper.write(0x8000, 0x80);
        assert_eq!(mapper.chr_read(0x0000), 9);
        assert_eq!(mapper.chr_read(0x1000), 3);
        assert_eq!(mapper.chr_read(0x1400), 4);
    }

    #[test]
    fn txrom_work_ram_honors_enable_and_protect_bits() {
        let prg = patterned_banks(0x8000, 0x2000);
        let mut mapper = make(4, prg, vec![], &BoardConfig::default());

        // Disabled at power-on: the window is absent, reads float.
        mapper.write(0x5000, 0x7E);
        assert_eq!(mapper.read(0x6000), 0x7E);

        mapper.write(0xA001, 0x80);
        mapper.write(0x6000, 0x55);
        assert_eq!(mapper.read(0x6000), 0x55);

        // Protected: reads work, writes are dropped.
        mapper.write(0xA001, 0xC0);
        mapper.write(0x6000, 0x77);
        assert_eq!(mapper.read(0x6000), 0x55);

        // Disabling hides the window without erasing the contents.
        mapper.write(0xA001, 0x00);
        assert_eq!(mapper.read(0x6000), 0x00);
        mapper.write(0xA001, 0x80);
        assert_eq!(mapper.read(0x6000), 0x55);
    }

    #[test]
    fn txrom_scanline_irq_fires_when_the_countdown_crosses_zero() {
        let prg = patterned_banks(0x8000, 0x2000);
        let mut mapper = make(4, prg, vec![], &BoardConfig::default());

        mapper.write(0xC000, 7);
        mapper.write(0xC001, 0);
        mapper.write(0xE001, 0);

        for scanline in 0..7 {
            assert!(!mapper.tick_irq(1), "fired early on scanline {scanline}");
        }
        assert!(mapper.tick_irq(1));
        assert!(mapper.irq_line());

        mapper.write(0xE000, 0);
        assert!(!mapper.irq_line());
        assert!(!mapper.tick_irq(100));
    }

    #[test]
    fn txrom_mirroring_register() {
        let prg = patterned_banks(0x8000, 0x2000);
        let mut mapper = make(
            4,
            prg,
            vec![],
            &BoardConfig {
                mirroring: Mirroring::Vertical,
                ..BoardConfig::default()
            },
        );

        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
        mapper.write(0xA000, 0x01);
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
    }

    #[test]
    fn vrc3_reload_latch_assembles_from_nibbles() {
        let prg = patterned_banks(0x8000, 0x4000);
        let mut mapper = make(73, prg, vec![], &BoardConfig::default());

        mapper.write(0x8000, 0x0E);
        mapper.write(0x9000, 0x0F);
        mapper.write(0xA000, 0x0F);
        mapper.write(0xB000, 0x0F);
        mapper.write(0xC000, 0x03); // enable, loads 0xFFFE

        assert!(!mapper.tick_irq(1)); // 0xFFFE -> 0xFFFF
        assert!(mapper.tick_irq(1)); // wrap fires

        // Ack register re-enables because the control write set bit 0.
        mapper.write(0xD000, 0);
        assert!(!mapper.irq_line());
        assert!(mapper.tick_irq(2)); // reloaded to 0xFFFE, wraps again
    }

    #[test]
    fn vrc3_switches_the_low_prg_window() {
        let prg = patterned_banks(4 * 0x4000, 0x4000);
        let mut mapper = make(73, prg, vec![], &BoardConfig::default());

        assert_eq!(mapper.read(0x8000), 1);
        assert_eq!(mapper.read(0xC000), 4);
        mapper.write(0xF000, 0x02);
        assert_eq!(mapper.read(0x8000), 3);
        assert_eq!(mapper.read(0xC000), 4);
    }

    #[test]
    fn vrc6_bank_select_save_and_restore_end_to_end() {
        // 128 KiB PRG, sixteen 8 KiB banks. Writing $13 to the 8 KiB select
        // register resolves to bank 3 under the masking law.
        let prg = patterned_banks(0x2_0000, 0x2000);
        let mut mapper = make(24, prg, vec![], &BoardConfig::default());

        mapper.write(0xC000, 0x13);
        assert_eq!(mapper.read(0xC000), 4);
        assert_eq!(mapper.read(0xE000), 16); // fixed last bank

        let snapshot = mapper.save_state();

        mapper.write(0xC000, 0x00);
        assert_eq!(mapper.read(0xC000), 1);

        assert_eq!(mapper.load_state(&snapshot), LoadOutcome::Applied);
        assert_eq!(mapper.read(0xC000), 4);
    }

    #[test]
    fn vrc6_prescaler_fires_at_the_scanline_rate() {
        let prg = patterned_banks(0x8000, 0x2000);
        let mut mapper = make(24, prg, vec![], &BoardConfig::default());

        mapper.write(0xF000, 0xFE);
        mapper.write(0xF001, 0x02); // enable, counter loads 0xFE

        // Two logical increments to rollover: 2 * 341 / 3 external clocks,
        // rounded up.
        assert!(!mapper.tick_irq(113)); // one increment: 0xFE -> 0xFF
        assert!(!mapper.tick_irq(113));
        assert!(mapper.tick_irq(2));
    }

    #[test]
    fn vrc6_mirroring_follows_the_control_register() {
        let prg = patterned_banks(0x8000, 0x2000);
        let mut mapper = make(24, prg, vec![], &BoardConfig::default());

        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
        mapper.write(0xB003, 0x04);
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
        mapper.write(0xB003, 0x08);
        assert_eq!(mapper.mirroring(), Mirroring::OneScreenLower);
    }

    #[test]
    fn restored_state_fires_irqs_on_the_same_tick_as_the_original() {
        let prg = patterned_banks(0x8000, 0x4000);
        let mut original = make(73, prg.clone(), vec![], &BoardConfig::default());

        original.write(0x8000, 0x00);
        original.write(0x9000, 0x0C);
        original.write(0xA000, 0x0F);
        original.write(0xB000, 0x0F); // reload 0xFFC0
        original.write(0xC000, 0x03);
        original.tick_irq(17);

        let snapshot = original.save_state();
        let mut restored = make(73, prg, vec![], &BoardConfig::default());
        assert_eq!(restored.load_state(&snapshot), LoadOutcome::Applied);

        let mut fired_at = (None, None);
        for tick in 0..0x100 {
            if original.tick_irq(1) && fired_at.0.is_none() {
                fired_at.0 = Some(tick);
            }
            if restored.tick_irq(1) && fired_at.1.is_none() {
                fired_at.1 = Some(tick);
            }
        }
        assert!(fired_at.0.is_some());
        assert_eq!(fired_at.0, fired_at.1);
    }

    #[test]
    fn restored_counter_values_are_forced_into_the_mode_width() {
        let prg = patterned_banks(0x8000, 0x4000);
        let mut mapper = make(73, prg, vec![], &BoardConfig::default());
        mapper.write(0xC000, 0x03);
        let saved = mapper.save_state();

        // A tampered or stale snapshot may carry a count the 16-bit counter
        // can never reach.
        let mut tampered = Snapshot::new();
        for tag in saved.tags() {
            if tag == "irq.count" {
                tampered.push(tag, 0x0002_0000u32.to_le_bytes().to_vec());
            } else {
                tampered.push(tag, saved.get(tag).expect("tag").to_vec());
            }
        }

        assert_eq!(mapper.load_state(&tampered), LoadOutcome::Applied);
        assert!(!mapper.tick_irq(1)); // count is 0x20000 & 0xFFFF = 0
        assert!(mapper.tick_irq(0xFFFF)); // wraps exactly at 0x10000 ticks
    }

    #[test]
    fn loading_an_unrelated_snapshot_falls_back_to_power_on() {
        let prg = patterned_banks(3 * 0x4000, 0x4000);
        let mut mapper = make(2, prg, vec![], &BoardConfig::default());

        mapper.write(0x8000, 1);
        assert_eq!(mapper.read(0x8000), 2);

        let mut unrelated = Snapshot::new();
        unrelated.push("something.else", vec![1, 2, 3]);
        assert_eq!(mapper.load_state(&unrelated), LoadOutcome::Absent);
        assert_eq!(mapper.read(0x8000), 1);
    }

    #[test]
    fn partial_snapshots_apply_what_they_have_and_report_the_rest() {
        let prg = patterned_banks(3 * 0x4000, 0x4000);
        let mut mapper = make(2, prg, vec![], &BoardConfig::default());

        let mut partial = Snapshot::new();
        partial.push("prg.bank", vec![0x01]);

        match mapper.load_state(&partial) {
            LoadOutcome::PartiallyApplied(missing) => {
                assert!(missing.contains(&"bus.open".to_string()));
                assert!(missing.contains(&"chr.ram".to_string()));
            }
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
        assert_eq!(mapper.read(0x8000), 2);
    }

    #[test]
    fn battery_ram_survives_close_and_reload() {
        let prg = patterned_banks(0x8000, 0x2000);
        let config = BoardConfig {
            battery: true,
            ..BoardConfig::default()
        };
        let mut mapper = make(4, prg.clone(), vec![], &config);

        mapper.write(0xA001, 0x80);
        mapper.write(0x6000, 0xAB);
        mapper.write(0x7FFF, 0xCD);
        let saved = mapper.close().expect("battery payload");

        let mut mapper = make(4, prg, vec![], &config);
        mapper.load_battery_ram(&saved);
        mapper.write(0xA001, 0x80);
        assert_eq!(mapper.read(0x6000), 0xAB);
        assert_eq!(mapper.read(0x7FFF), 0xCD);
    }

    #[test]
    fn boards_without_battery_yield_nothing_on_close() {
        let prg = patterned_banks(0x8000, 0x2000);
        let mapper = make(4, prg, vec![], &BoardConfig::default());
        assert!(mapper.battery_ram().is_none());
        assert!(mapper.close().is_none());
    }

    #[test]
    fn soft_reset_preserves_ram_contents_and_irq_enable() {
        let prg = patterned_banks(0x8000, 0x2000);
        let mut mapper = make(4, prg, vec![], &BoardConfig::default());

        mapper.write(0xA001, 0x80);
        mapper.write(0x6000, 0xAB);
        mapper.write(0xC000, 2);
        mapper.write(0xC001, 0);
        mapper.write(0xE001, 0);
        mapper.tick_irq(1);

        mapper.reset();

        // Registers returned to power-on values: the RAM window is hidden
        // again, but the bytes behind it survived.
        mapper.write(0xA001, 0x80);
        assert_eq!(mapper.read(0x6000), 0xAB);

        // The countdown kept its enable and its position.
        assert!(mapper.tick_irq(2));
    }

    #[test]
    fn bank_resolution_is_idempotent() {
        for (board_id, prg) in [
            (2u16, patterned_banks(0x8000, 0x4000)),
            (4, patterned_banks(0x8000, 0x2000)),
            (24, patterned_banks(0x8000, 0x2000)),
            (73, patterned_banks(0x8000, 0x4000)),
        ] {
            let mapper = make(board_id, prg, vec![], &BoardConfig::default());
            assert_eq!(mapper.windows(), mapper.windows(), "board {board_id}");
        }
    }

    #[test]
    fn fixture_window_lists_claim_each_page_exactly_once() {
        for (board_id, prg) in [
            (2u16, patterned_banks(0x8000, 0x4000)),
            (4, patterned_banks(0x8000, 0x2000)),
            (24, patterned_banks(0x8000, 0x2000)),
            (73, patterned_banks(0x8000, 0x4000)),
        ] {
            let mut mapper = make(board_id, prg, vec![], &BoardConfig::default());
            if board_id == 4 {
                mapper.write(0xA001, 0x80);
            }
            let windows = mapper.windows();

            // The full ROM space is always claimed.
            for addr in (0x8000usize..0x1_0000).step_by(0x400) {
                let claims = windows
                    .iter()
                    .filter(|w| w.space == AddressSpace::Cpu)
                    .filter(|w| (w.start as usize..w.start as usize + w.size).contains(&addr))
                    .count();
                assert_eq!(claims, 1, "board {board_id} addr ${addr:04X}");
            }
            for addr in (0x0000usize..0x2000).step_by(0x400) {
                let claims = windows
                    .iter()
                    .filter(|w| w.space == AddressSpace::Chr)
                    .filter(|w| (w.start as usize..w.start as usize + w.size).contains(&addr))
                    .count();
                assert_eq!(claims, 1, "board {board_id} chr ${addr:04X}");
            }
        }
    }
}
