// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-session bridge names.
//
// Every bridge object the host exposes to a page lives under a random global
// name that the injected script captures and then deletes from `window`.
// Names are built from two random UUIDs: hyphens replaced by a random letter,
// the 36-char strings cut into six 6-char blocks, and each name formed as
// `letter + a[i] + b[i]`. Block 0 of each UUID builds the decoy script URL.

use rand::Rng;
use tracing::debug;
use uuid::Builder;

const LETTERS: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Random names for one bridge session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeNames {
    /// Native call entry point (`<java>.request(name, args, id)`).
    pub java: String,
    /// Result cache accessor (`<cache>.getFromMemory(id)`).
    pub cache: String,
    /// Source accessor.
    pub source: String,
    /// Orientation lock / close accessor used by the basic shim.
    pub basic: String,
    /// Result dispatch function installed on `window`.
    pub result: String,
    /// Script URL the page loads the bridge from; the host intercepts it.
    pub decoy_url: String,
}

impl BridgeNames {
    /// Fresh names from the thread-local RNG. Call once per session; never
    /// cache across sessions.
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let names = Self::draw(rng);
            if names.is_distinct() {
                debug!(decoy_url = %names.decoy_url, "bridge names generated");
                return names;
            }
        }
    }

    fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let a = uuid_blocks(rng);
        let b = uuid_blocks(rng);
        let mut name = |i: usize| format!("{}{}{}", random_letter(rng), a[i], b[i]);
        Self {
            java: name(1),
            cache: name(2),
            source: name(3),
            basic: name(4),
            result: name(5),
            decoy_url: format!("https://{}.com/{}.js", a[0], b[0]),
        }
    }

    /// The five global identifiers, in declaration order.
    pub fn identifiers(&self) -> [&str; 5] {
        [&self.java, &self.cache, &self.source, &self.basic, &self.result]
    }

    fn is_distinct(&self) -> bool {
        let ids = self.identifiers();
        ids.iter()
            .enumerate()
            .all(|(i, id)| ids[i + 1..].iter().all(|other| other != id))
    }
}

fn random_letter<R: Rng + ?Sized>(rng: &mut R) -> char {
    LETTERS[rng.gen_range(0..LETTERS.len())] as char
}

fn uuid_blocks<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    let uuid = Builder::from_random_bytes(rng.r#gen()).into_uuid();
    let filler = random_letter(rng).to_string();
    let text = uuid.hyphenated().to_string().replace('-', &filler);
    text.as_bytes()
        .chunks(6)
        .map(|block| String::from_utf8_lossy(block).into_owned())
        .collect()
}
