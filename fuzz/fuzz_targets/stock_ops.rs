#![no_main]

//! Fuzzes the `Stock` contract by replaying an arbitrary op-stream against
//! `FileStock` and `MemoryStock` in lockstep through `ShadowStock`, which
//! panics on the first disagreement.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use stock_store::stock::{FileStock, MemoryStock, ShadowStock, Stock};
use stock_store::value::FixedBytes;

type Value = [u8; 8];
type Primary = FileStock<u32, Value, FixedBytes<8>>;
type Secondary = MemoryStock<u32, Value, FixedBytes<8>>;

#[derive(Arbitrary, Debug)]
enum Op {
    New,
    Get(u32),
    Set(u32, u64),
    Delete(u32),
    Flush,
}

fuzz_target!(|ops: Vec<Op>| {
    let dir = tempfile::tempdir().expect("tempdir");
    let primary: Primary = FileStock::open(dir.path()).expect("open FileStock");
    let secondary: Secondary = MemoryStock::new();
    let mut shadow = ShadowStock::new(primary, secondary);

    let mut live_ids: Vec<u32> = Vec::new();

    for op in ops {
        match op {
            Op::New => {
                let id = shadow.new_id().expect("new_id must not error");
                live_ids.push(id);
            }
            Op::Get(i) => {
                let _ = shadow.get(i);
            }
            Op::Set(i, v) => {
                let _ = shadow.set(i, v.to_be_bytes());
            }
            Op::Delete(i) => {
                let _ = shadow.delete(i);
                live_ids.retain(|&x| x != i);
            }
            Op::Flush => {
                let _ = shadow.flush();
            }
        }
    }
});
