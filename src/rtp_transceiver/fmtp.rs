use std::collections::HashMap;

use unicase::UniCase;

use crate::api::media_engine::{MIME_TYPE_H264, MIME_TYPE_VP9};

type Fmtp = HashMap<String, String>;

const H264_DEFAULT_PROFILE_LEVEL_ID: &str = "42e01f";

/// parse_fmtp parses fmtp string.
pub(crate) fn parse_fmtp(line: &str) -> Fmtp {
    let mut f = Fmtp::new();
    for p in line.split(';') {
        let p = p.trim();
        if p.is_empty() {
            continue;
        }
        let (key, value) = match p.split_once('=') {
            Some((key, value)) => (key, value.trim()),
            None => (p, ""),
        };
        f.insert(key.trim().to_lowercase(), value.to_owned());
    }
    f
}

/// fmtp_consist checks that two FMTP parameters are not inconsistent.
pub(crate) fn fmtp_consist(a: &Fmtp, b: &Fmtp) -> bool {
    a.iter().all(|(k, v)| match b.get(k) {
        Some(vb) => UniCase::new(vb) == UniCase::new(v),
        None => true,
    })
}

/// fmtp_match reports whether two fmtp lines of the same codec describe a
/// compatible configuration. H.264 compares packetization-mode and the
/// profile part of profile-level-id (RFC6184 8.2.2), VP9 compares
/// profile-id, every other codec must not disagree on shared keys.
pub(crate) fn fmtp_match(mime_type: &str, a: &str, b: &str) -> bool {
    let (fa, fb) = (parse_fmtp(a), parse_fmtp(b));
    let mime_type = UniCase::new(mime_type);

    if mime_type == UniCase::new(MIME_TYPE_H264) {
        let mode = |f: &Fmtp| f.get("packetization-mode").cloned().unwrap_or_else(|| "0".to_owned());
        if mode(&fa) != mode(&fb) {
            return false;
        }

        let plid = |f: &Fmtp| {
            f.get("profile-level-id")
                .cloned()
                .unwrap_or_else(|| H264_DEFAULT_PROFILE_LEVEL_ID.to_owned())
        };
        profile_level_id_matches(&plid(&fa), &plid(&fb))
    } else if mime_type == UniCase::new(MIME_TYPE_VP9) {
        let profile = |f: &Fmtp| f.get("profile-id").cloned().unwrap_or_else(|| "0".to_owned());
        profile(&fa) == profile(&fb)
    } else {
        fmtp_consist(&fa, &fb)
    }
}

/// Only profile_idc and profile-iop have to match, the level may differ.
fn profile_level_id_matches(a: &str, b: &str) -> bool {
    let aa = match hex::decode(a) {
        Ok(aa) if aa.len() >= 2 => aa,
        _ => return false,
    };
    let bb = match hex::decode(b) {
        Ok(bb) if bb.len() >= 2 => bb,
        _ => return false,
    };

    aa[0] == bb[0] && aa[1] == bb[1]
}
