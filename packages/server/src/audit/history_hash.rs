use crate::models::history::{HistoryEntry, Outcome};

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

pub const GENESIS: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Hash of one history entry chained onto the hash of the entry before it.
/// The entry's own `audit_hash` field is not part of the input.
pub fn compute_entry_hash(previous: &str, room_code: &str, entry: &HistoryEntry) -> String {
    let mut input = Vec::new();

    input.extend_from_slice(b"prev:");
    input.extend_from_slice(previous.as_bytes());

    input.extend_from_slice(b"|room:");
    input.extend_from_slice(room_code.as_bytes());

    input.extend_from_slice(b"|seq:");
    input.extend_from_slice(&entry.sequence.to_le_bytes());
    input.extend_from_slice(b"|day:");
    input.extend_from_slice(&entry.day_number.to_le_bytes());
    input.extend_from_slice(b"|phase:");
    input.extend_from_slice(&entry.phase_id.to_le_bytes());

    // actions are already in submission order
    input.extend_from_slice(b"|actions:");
    input.extend_from_slice(&(entry.actions.len() as u64).to_le_bytes());
    for action in &entry.actions {
        input.extend_from_slice(action.actor_id.as_bytes());
        input.push(b'>');
        input.extend_from_slice(action.target_id.as_bytes());
        input.push(action.kind as u8);
        input.extend_from_slice(&action.sequence.to_le_bytes());
    }

    input.extend_from_slice(b"|outcome:");
    match &entry.outcome {
        Outcome::Night { killed, saved, .. } => {
            input.push(0);
            push_optional(&mut input, killed.as_deref());
            push_optional(&mut input, saved.as_deref());
        }
        Outcome::Day {
            eliminated, tied, ..
        } => {
            input.push(1);
            push_optional(&mut input, eliminated.as_deref());
            input.push(if *tied { 1 } else { 0 });
        }
    }

    input.extend_from_slice(b"|at:");
    input.extend_from_slice(&entry.resolved_at.timestamp_millis().to_le_bytes());

    bytes32_to_hex(&hash_bytes(&input))
}

/// Recomputes the whole chain; returns the sequence of the first entry whose
/// stored hash does not match.
pub fn verify_chain(room_code: &str, history: &[HistoryEntry]) -> Result<(), u32> {
    let mut previous = GENESIS.to_string();
    for entry in history {
        let expected = compute_entry_hash(&previous, room_code, entry);
        if expected != entry.audit_hash {
            return Err(entry.sequence);
        }
        previous = expected;
    }
    Ok(())
}

fn push_optional(input: &mut Vec<u8>, value: Option<&str>) {
    match value {
        Some(v) => {
            input.push(1);
            input.extend_from_slice(v.as_bytes());
        }
        None => input.push(0),
    }
    input.push(b';');
}

pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    let mut out = String::with_capacity(66);
    out.push_str("0x");
    for b in bytes {
        out.push(HEX[(b >> 4) as usize]);
        out.push(HEX[(b & 0x0f) as usize]);
    }
    out
}

pub fn hash_bytes(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..4 {
        let seed = FNV_OFFSET_BASIS ^ (i as u64 + 1).wrapping_mul(0x9e3779b97f4a7c15);
        let part = fnv1a64_with_seed(bytes, seed).to_le_bytes();
        let start = i * 8;
        out[start..start + 8].copy_from_slice(&part);
    }
    out
}

fn fnv1a64_with_seed(bytes: &[u8], seed: u64) -> u64 {
    let mut hash = seed;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

const HEX: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];
