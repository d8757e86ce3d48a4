pub mod debug_flags;
pub mod ppu;

pub use ppu::{
    BackgroundTileRegister, Oam, OamEntry, PatternMemory, PixelPipeline, ScanlineEvaluation,
    SpriteEvaluator, SpriteSlot, VideoMemory,
};
