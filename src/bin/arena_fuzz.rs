//! Fill-and-check fuzzer: drives an [`Arena`] from the outside, catching
//! misaligned pointers and cross-allocation corruption.

use std::process::ExitCode;
use std::ptr::NonNull;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use field_arena::{Arena, BoxSlabSource};

#[derive(Parser, Debug)]
#[command(name = "arena_fuzz", about = "Fill-and-check fuzzer for field_arena")]
struct Args {
    /// Initial min_field_size.
    #[arg(long, default_value_t = 4096)]
    field_size: usize,

    /// Number of fuzz iterations.
    #[arg(long, default_value_t = 1_000_000)]
    iterations: u64,

    /// PRNG seed.
    #[arg(long, default_value_t = 0x12345)]
    seed: u64,

    /// Maximum requested allocation size per iteration.
    #[arg(long, default_value_t = 8192)]
    max_alloc: usize,

    /// Maximum alignment exponent K, alignment is 2^K, K in [0, 16].
    #[arg(long, default_value_t = 10)]
    max_align: u32,
}

struct Slot {
    ptr: NonNull<u8>,
    size: usize,
    fill: u8,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.max_align > 16 {
        eprintln!("--max-align must be in [0, 16]");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("arena_fuzz: {msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let mut arena = Arena::with_source(BoxSlabSource);
    arena
        .set_min_field_size(args.field_size)
        .map_err(|e| e.to_string())?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut slots: Vec<Option<Slot>> = (0..256).map(|_| None).collect();

    for idx in 0..args.iterations {
        let slot_idx = (rng.gen::<usize>()) % slots.len();

        if let Some(slot) = slots[slot_idx].take() {
            let bytes = unsafe { std::slice::from_raw_parts(slot.ptr.as_ptr(), slot.size) };
            if bytes.iter().any(|&b| b != slot.fill) {
                return Err(format!(
                    "iteration {idx}: slot {slot_idx} corrupted (expected fill {:#x})",
                    slot.fill
                ));
            }
            unsafe { arena.free(Some(slot.ptr)) };
            continue;
        }

        let size = 1 + (rng.gen::<usize>() % args.max_alloc);
        let k = rng.gen_range(0..=args.max_align);
        let align = 1usize << k;
        let size = size.max(align);

        let ptr = match arena.alloc(size, align) {
            Ok(p) => p,
            Err(e) => return Err(format!("iteration {idx}: alloc({size}, {align}) failed: {e}")),
        };

        if (ptr.as_ptr() as usize) % align != 0 {
            return Err(format!(
                "iteration {idx}: pointer {:p} not aligned to {align}",
                ptr.as_ptr()
            ));
        }

        let fill = (idx & 0xFF) as u8;
        unsafe {
            ptr.as_ptr().write_bytes(fill, size);
        }
        slots[slot_idx] = Some(Slot { ptr, size, fill });
    }

    Ok(())
}
