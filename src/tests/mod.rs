use super::{BuildError, Mph, Policy, PolicyError, DEFAULT_CASCADE};
use alloc::vec::Vec;
use rapidhash::RapidRng;

/// NASDAQ symbols padded to eight characters; large enough that small direct tables fail and the
/// cascade has to reach for its bigger schemes.
const TICKERS: [&str; 100] = [
    "III     ", "AGM-C   ", "LOPE    ", "FEMS    ", "IEA     ", "VYMI    ", "BHK     ", "SIEB    ",
    "DGBP    ", "INFN    ", "USRT    ", "BCOR    ", "TWM     ", "BVSN    ", "STBA    ", "GPK     ",
    "LVHD    ", "FTEK    ", "GLBS    ", "CUBB    ", "LRCX    ", "HTGM    ", "RYN     ", "IPG     ",
    "PNNTG   ", "ZIG     ", "IVR-A   ", "INVA    ", "MNE     ", "KRA     ", "BRMK    ", "ARKG    ",
    "FFR     ", "QTRX    ", "XTN     ", "BAC-A   ", "CYBE    ", "ETJ     ", "JHCS    ", "RBCAA   ",
    "GDS     ", "WTID    ", "TCO     ", "BWA     ", "MIE     ", "GENY    ", "TDOC    ", "MCRO    ",
    "QFIN    ", "NBTB    ", "PWC     ", "FQAL    ", "NJAN    ", "IWB     ", "GXGXW   ", "EDUC    ",
    "RETL    ", "VIACA   ", "KLDO    ", "NEE-I   ", "FBC     ", "JW.A    ", "BSMX    ", "FMNB    ",
    "EXR     ", "TAC     ", "FDL     ", "SWIR    ", "CLWT    ", "LMHB    ", "IRTC    ", "CDMO    ",
    "HMLP-A  ", "LVUS    ", "UMRX    ", "GJH     ", "FRME    ", "CEIX    ", "IHD     ", "GHSI    ",
    "DCP-B   ", "SB      ", "DSE     ", "CPRT    ", "NRZ     ", "VLYPO   ", "TDAC    ", "ZXZZT   ",
    "IWX     ", "NCSM    ", "WIRE    ", "SFST    ", "EWD     ", "DEACW   ", "TRPX    ", "UCTT    ",
    "ZAZZT   ", "CYD     ", "NURE    ", "WEAT    ",
];

fn assert_bijection(table: &Mph, keys: &[&str]) {
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(table.get(key), i as u32 + 1, "key {key:?}");
    }
}

#[test]
fn single_letters() {
    let table = Mph::from_keys(["A", "B", "C"]);
    assert_bijection(&table, &["A", "B", "C"]);
    assert_eq!(table.len(), 3);

    assert_eq!(table.get(""), 0);
    assert_eq!(table.get("D"), 0);
    assert_eq!(table.get("a"), 0);
    assert_eq!(table.get("b"), 0);
}

#[test]
fn key_names() {
    let table = Mph::from_keys(["enter", "delete", "esc"]);
    assert_bijection(&table, &["enter", "delete", "esc"]);

    assert_eq!(table.get(""), 0);
    assert_eq!(table.get("stop"), 0);
    assert_eq!(table.get("start"), 0);
    assert_eq!(table.get("foobar"), 0);
}

#[test]
fn padding_is_significant() {
    let table = Mph::from_keys([" AA ", " AB ", " AC "]);
    assert_bijection(&table, &[" AA ", " AB ", " AC "]);

    assert_eq!(table.get(""), 0);
    assert_eq!(table.get(" AA"), 0);
    assert_eq!(table.get("AA "), 0);
    assert_eq!(table.get(" AA_"), 0);
    assert_eq!(table.get("_AA_"), 0);
    assert_eq!(table.get(" aa "), 0);
}

#[test]
fn tickers() {
    let table = Mph::from_keys(TICKERS);
    assert_bijection(&table, &TICKERS);
    assert_eq!(table.get("III     "), 1);
    assert_eq!(table.get("WEAT    "), 100);

    assert_eq!(table.get("        "), 0);
    assert_eq!(table.get(" III    "), 0);
    assert_eq!(table.get("  III   "), 0);
    assert_eq!(table.get("   III  "), 0);
    assert_eq!(table.get("    III "), 0);
    assert_eq!(table.get("     III"), 0);
    assert_eq!(table.get("III"), 0);
}

#[test]
fn custom_policy() {
    let table = Mph::with_policy(["A", "B", "C"], Policy::Direct { max_bits: 5 });
    assert_bijection(&table, &["A", "B", "C"]);
    assert_eq!(table.get(""), 0);
    assert_eq!(table.get("D"), 0);
    assert_eq!(table.get("a"), 0);
}

#[test]
fn policies_are_observationally_equivalent() {
    let keys = ["A", "B", "C"];
    let probes = ["", "A", "B", "C", "D", "a", "AB", "\0"];
    for &policy in DEFAULT_CASCADE {
        let table = Mph::with_policy(keys, policy);
        assert_bijection(&table, &keys);
        for probe in probes {
            let expected = keys.iter().position(|&key| key == probe);
            assert_eq!(
                table.get(probe),
                expected.map_or(0, |i| i as u32 + 1),
                "probe {probe:?} under {policy:?}"
            );
        }
    }

    // The ticker set is served by three different schemes; all must agree everywhere.
    let direct = Mph::with_policy(TICKERS, Policy::Direct { max_bits: 16 });
    let split7 = Mph::with_policy(TICKERS, Policy::SplitOnFirstChar { max_bits: 7 });
    let split8 = Mph::with_policy(TICKERS, Policy::SplitOnFirstChar { max_bits: 8 });
    for table in [&direct, &split7, &split8] {
        assert_bijection(table, &TICKERS);
        assert_eq!(table.get("IEA     "), 5);
        assert_eq!(table.get("IEA"), 0);
        assert_eq!(table.get("iii     "), 0);
    }
}

#[test]
fn overlong_inputs_never_match() {
    let table = Mph::from_keys(["enter", "delete", "esc"]);
    assert_eq!(table.get("deletes"), 0);
    assert_eq!(table.get("deleted items"), 0);
    // Nine bytes sharing the first eight with no key.
    assert_eq!(table.get("delete!!!"), 0);
}

#[test]
fn mixed_input_forms() {
    let table = Mph::from_keys(["wss", "ws"]);
    assert_eq!(table.get("wss"), 1);
    assert_eq!(table.get(b"wss" as &[u8]), 1);
    assert_eq!(table.get([b'w', b's']), 2);
    assert_eq!(table.get(&[b'w', b's', b's']), 1);
}

#[test]
fn build_rejects_bad_sets() {
    let no_keys: [&str; 0] = [];
    assert_eq!(Mph::try_from_keys(no_keys).unwrap_err(), BuildError::NoKeys);

    assert_eq!(
        Mph::try_from_keys(["A", "", "C"]).unwrap_err(),
        BuildError::EmptyKey { index: 1 }
    );

    assert_eq!(
        Mph::try_from_keys(["up", "down", "up"]).unwrap_err(),
        BuildError::DuplicateKey {
            first: 0,
            second: 2
        }
    );

    // A nine-byte key defeats every policy, and the error names the first failure.
    assert_eq!(
        Mph::try_from_keys(["short", "very long key"]).unwrap_err(),
        BuildError::NoViablePolicy(PolicyError::KeyTooLong { index: 1 })
    );
}

#[test]
fn trailing_zero_bytes_are_distinct_lengths() {
    // "A" and "A\0" pack into the same word, so no mask separates them; construction must refuse
    // rather than silently conflate the two.
    let err = Mph::try_from_keys([&b"A"[..], &b"A\0"[..]]).unwrap_err();
    assert!(matches!(err, BuildError::NoViablePolicy(_)), "{err:?}");

    // With only one of them present, the other must still miss.
    let table = Mph::from_keys([&b"A\0"[..]]);
    assert_eq!(table.get(b"A\0" as &[u8]), 1);
    assert_eq!(table.get("A"), 0);
}

#[test]
fn randomized_membership() {
    let mut rng = RapidRng::new(0x243f_6a88_85a3_08d3);
    let mut built = 0;

    for _ in 0..100 {
        let count = rng.next() as usize % 12 + 1;
        let mut keys: Vec<Vec<u8>> = (0..count)
            .map(|_| {
                let len = rng.next() as usize % 8 + 1;
                rng.next().to_le_bytes()[..len].to_vec()
            })
            .collect();
        keys.sort_unstable();
        keys.dedup();

        // Random sets occasionally defeat every policy; the contract below only holds for the
        // ones that build.
        let Ok(table) = Mph::try_from_keys(keys.iter()) else {
            continue;
        };
        built += 1;

        for (i, key) in keys.iter().enumerate() {
            assert_eq!(table.get(key), i as u32 + 1);
        }

        for key in &keys {
            let mut probe = key.clone();
            probe.push(b'!');
            let expected = keys.iter().position(|other| other == &probe);
            assert_eq!(table.get(&probe), expected.map_or(0, |i| i as u32 + 1));

            let mut flipped = key.clone();
            flipped[0] ^= 0x20;
            let expected = keys.iter().position(|other| other == &flipped);
            assert_eq!(table.get(&flipped), expected.map_or(0, |i| i as u32 + 1));
        }
    }

    assert!(built > 0, "no random set built at all");
}

#[cfg(feature = "serde")]
mod serde_round_trips {
    use super::*;
    use alloc::string::String;

    #[test]
    fn round_trip() {
        for keys in [&["A", "B", "C"][..], &TICKERS[..]] {
            let table = Mph::from_keys(keys.iter().copied());
            let json = serde_json::to_string(&table).unwrap();
            let restored: Mph = serde_json::from_str(&json).unwrap();
            for (i, key) in keys.iter().enumerate() {
                assert_eq!(restored.get(key), i as u32 + 1);
            }
            assert_eq!(restored.get("missing"), 0);
            assert_eq!(restored.len(), keys.len());
        }
    }

    #[test]
    fn tampered_tables_are_rejected() {
        let table = Mph::from_keys(["A", "B", "C"]);
        let json = serde_json::to_string(&table).unwrap();

        // The summary numbers must match the cells.
        let grown: String = json.replace("\"len\":3", "\"len\":4");
        assert!(serde_json::from_str::<Mph>(&grown).is_err());
        let stretched: String = json.replace("\"max_len\":1", "\"max_len\":7");
        assert!(serde_json::from_str::<Mph>(&stretched).is_err());
    }
}
