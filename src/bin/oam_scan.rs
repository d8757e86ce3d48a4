use nes_pixel_pipeline::debug_flags;
use nes_pixel_pipeline::ppu::{NullPatternMemory, PatternMemory, VISIBLE_SCANLINES};
use nes_pixel_pipeline::{Oam, SpriteEvaluator, VideoMemory};
use std::path::PathBuf;
use std::process;

// OAM dump scanner
// Usage:
//   cargo run --bin oam_scan -- oam.bin --chr chr.bin --large --table 0x1000 --first 0 --last 239
// Scanline range defaults can also come from OAM_SCAN_FIRST / OAM_SCAN_LAST.

struct Options {
    oam: PathBuf,
    chr: Option<PathBuf>,
    large: bool,
    table: u16,
    first: u16,
    last: u16,
    all: bool,
}

fn parse_u16_hex_or_dec(s: &str) -> Option<u16> {
    let s = s.trim();
    if let Some(stripped) = s.strip_prefix("0x") {
        u16::from_str_radix(stripped, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn parse_args() -> Result<Options, String> {
    let mut args = std::env::args().skip(1);
    let mut oam: Option<PathBuf> = None;
    let mut chr: Option<PathBuf> = None;
    let mut large = false;
    let mut table = 0x0000;
    let mut first: Option<u16> = None;
    let mut last: Option<u16> = None;
    let mut all = false;

    fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<u16, String> {
        let raw = args
            .next()
            .ok_or_else(|| format!("{} needs a value", flag))?;
        parse_u16_hex_or_dec(&raw).ok_or_else(|| format!("{}: '{}' is not a number", flag, raw))
    }

    while let Some(a) = args.next() {
        match a.as_str() {
            "--chr" => {
                let path = args.next().ok_or("--chr needs a path")?;
                chr = Some(PathBuf::from(path));
            }
            "--large" | "--8x16" => large = true,
            "--table" => {
                table = value(&mut args, "--table")?;
                if table != 0x0000 && table != 0x1000 {
                    return Err(format!("--table must be 0x0000 or 0x1000, got 0x{:04X}", table));
                }
            }
            "--first" => first = Some(value(&mut args, "--first")?),
            "--last" => last = Some(value(&mut args, "--last")?),
            "--all" => all = true,
            _ if a.starts_with("--") => return Err(format!("unknown option {}", a)),
            _ => {
                if oam.is_some() {
                    return Err(format!("unexpected argument {}", a));
                }
                oam = Some(PathBuf::from(&a));
            }
        }
    }

    let oam = oam.ok_or("OAM dump path is required")?;
    let first = first.unwrap_or_else(|| debug_flags::env_u16("OAM_SCAN_FIRST", 0));
    let last = last.unwrap_or_else(|| debug_flags::env_u16("OAM_SCAN_LAST", VISIBLE_SCANLINES - 1));
    if first > last {
        return Err(format!("scanline range {}..={} is empty", first, last));
    }

    Ok(Options { oam, chr, large, table, first, last, all })
}

fn load_oam(path: &PathBuf) -> Result<Oam, String> {
    let data = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    Oam::from_bytes(&data).map_err(|e| format!("{}: {}", path.display(), e))
}

fn load_chr(path: &PathBuf) -> Result<VideoMemory, String> {
    let data = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    VideoMemory::with_chr(&data).map_err(|e| format!("{}: {}", path.display(), e))
}

fn scan<M: PatternMemory>(options: &Options, oam: &Oam, memory: &M) -> usize {
    let mut evaluator = SpriteEvaluator::new();
    let mut overflow_lines = 0;

    for scanline in options.first..=options.last {
        let result = evaluator.evaluate_scanline(oam, memory, options.large, options.table, scanline as u32);
        if result.overflow {
            overflow_lines += 1;
        }
        if result.sprite_count == 0 && !options.all {
            continue;
        }

        println!(
            "line {:3}: {} sprite(s){}",
            scanline,
            result.sprite_count,
            if result.overflow { " [overflow]" } else { "" }
        );
        for (slot, sprite) in evaluator.active_slots().iter().enumerate() {
            println!(
                "  slot {} oam {:2} x={:3} {} data={:08X}",
                slot,
                sprite.oam_index,
                sprite.position_x,
                if sprite.priority { "back " } else { "front" },
                sprite.pattern_data
            );
        }
    }

    overflow_lines
}

fn main() {
    env_logger::init();

    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("oam_scan: {}", e);
            eprintln!("usage: oam_scan <oam.bin> [--chr chr.bin] [--large] [--table 0x1000] [--first N] [--last N] [--all]");
            process::exit(2);
        }
    };

    let oam = match load_oam(&options.oam) {
        Ok(oam) => oam,
        Err(e) => {
            eprintln!("oam_scan: {}", e);
            process::exit(1);
        }
    };

    if !debug_flags::quiet() {
        println!(
            "OAM scan: {} sprites={} table=0x{:04X} lines {}..={}",
            options.oam.display(),
            if options.large { "8x16" } else { "8x8" },
            options.table,
            options.first,
            options.last
        );
    }

    let overflow_lines = match &options.chr {
        Some(path) => match load_chr(path) {
            Ok(memory) => scan(&options, &oam, &memory),
            Err(e) => {
                eprintln!("oam_scan: {}", e);
                process::exit(1);
            }
        },
        None => scan(&options, &oam, &NullPatternMemory),
    };

    log::info!("{} scanline(s) overflowed", overflow_lines);
}
