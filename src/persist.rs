//! JSON artifact output.
//!
//! The final, gap-free packet set is written as a JSON array of objects
//! sorted ascending by sequence, overwriting any prior content at the
//! destination.  A write failure here is fatal to the run — there is no
//! partial-output recovery.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::packet::Packet;

/// Serialize `packets` (already sorted by the caller) to `path`.
///
/// The output is pretty-printed JSON so the artifact stays human-readable.
pub fn save(packets: &[Packet], path: &Path) -> std::io::Result<()> {
    debug_assert!(
        packets.windows(2).all(|w| w[0].sequence <= w[1].sequence),
        "persist::save expects packets sorted by sequence"
    );
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, packets)?;
    writer.flush()?;
    log::info!("saved {} packet(s) to {}", packets.len(), path.display());
    Ok(())
}

/// Read an artifact back into memory.
///
/// Used by the round-trip tests and by downstream tooling that consumes the
/// artifact.
pub fn load(path: &Path) -> std::io::Result<Vec<Packet>> {
    let file = File::open(path)?;
    let packets = serde_json::from_reader(BufReader::new(file))?;
    Ok(packets)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Side;

    fn pkt(seq: i32) -> Packet {
        Packet {
            symbol: "AAPL".into(),
            side: if seq % 2 == 0 { Side::Sell } else { Side::Buy },
            quantity: seq * 10,
            price: seq * 100,
            sequence: seq,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exchange_data.json");

        let packets: Vec<Packet> = (1..=5).map(pkt).collect();
        save(&packets, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, packets);
    }

    #[test]
    fn artifact_is_sorted_strictly_ascending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        save(&[pkt(1), pkt(2), pkt(4)], &path).unwrap();
        let loaded = load(&path).unwrap();
        assert!(loaded.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[test]
    fn save_overwrites_prior_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        save(&(1..=10).map(pkt).collect::<Vec<_>>(), &path).unwrap();
        save(&[pkt(1)], &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn artifact_uses_documented_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        save(&[pkt(3)], &path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let obj = &value[0];
        assert_eq!(obj["symbol"], "AAPL");
        assert_eq!(obj["buySellIndicator"], "B");
        assert_eq!(obj["quantity"], 30);
        assert_eq!(obj["price"], 300);
        assert_eq!(obj["sequence"], 3);
    }

    #[test]
    fn save_to_unwritable_path_is_an_error() {
        let path = Path::new("/nonexistent-dir/out.json");
        assert!(save(&[pkt(1)], path).is_err());
    }

    #[test]
    fn empty_set_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        save(&[], &path).unwrap();
        assert!(load(&path).unwrap().is_empty());
    }
}
