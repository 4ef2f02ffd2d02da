use assoc_cache::{config::DynSystem, Result};

const CONFLICTS: [u32; 4] = [0x0040, 0x1040, 0x2040, 0x3040];

/// Replays the reference sequence: a write/read round trip, repeated writes to
/// one word, then five conflicting lines squeezed into one 4-way set.
pub fn run(system: &mut DynSystem) -> Result<()> {
    let marked = [0x10..0x14, 0x20..0x24, 0x40..0x41];

    println!("Initial memory slice:");
    system.print_memory(&marked);

    system.read(0x20)?;
    system.read(0x20)?;
    system.write(0x20, 0x6139)?;
    let value = system.read(0x20)?;
    println!("\nValue at address 0x20: {value:#x}");
    println!("\nMemory slice after writing 0x6139 to address 0x20:");
    system.print_memory(&marked);

    println!("\nWriting multiple values to address 0x10...");
    for value in [0x1234_5678, 0x7777_7777, 0x5269_0723] {
        system.write(0x10, value)?;
    }
    let result = system.read(0x10)?;
    println!("Value at address 0x10 (from cache): {result:#x}");
    println!("\nMemory slice after multiple writes to address 0x10:");
    system.print_memory(&marked);

    println!("\n--- Cache Thrashing ---");
    let set = system.cache().split_addr(CONFLICTS[0]).set;
    println!("\nFilling cache set with 4 entries (expecting misses)...");
    report(system, &CONFLICTS)?;
    println!("\nAfter filling 4 entries:");
    system.print_set(set);

    println!("\nReading same addresses again (expecting hits)...");
    report(system, &CONFLICTS)?;

    println!("\nAccessing 0x4040 (should cause eviction)...");
    report(system, &[0x4040])?;
    println!("\nAfter inserting 5th conflicting address:");
    system.print_set(set);

    println!("\nRe-reading original 4 addresses (expect one miss due to eviction)...");
    report(system, &CONFLICTS)?;
    Ok(())
}

fn report(system: &mut DynSystem, addrs: &[u32]) -> Result<()> {
    for &addr in addrs {
        let before = system.stats().hits();
        system.read(addr)?;
        let outcome = if system.stats().hits() > before {
            "hit"
        } else {
            "miss"
        };
        println!("  read {addr:#06x}: {outcome}");
    }
    Ok(())
}
