//! Format-preserving replacement synthesis.
//!
//! `generate_safe_replacement` is a pure function keyed only by
//! `(key, value, index)`: a stable hash of that triple seeds a small
//! xorshift stream, so identical input always yields identical output.
//! Replacements keep the punctuation skeleton and exact length of the
//! original and are deliberately invalid as instruments (checksums broken,
//! phone numbers steered into the reserved 555-01xx range).

use crate::types::DetectedMatch;
use veil_rules::validators;

const CONSONANTS: &[u8] = b"bcdfghjklmnpqrstvwz";
const VOWELS: &[u8] = b"aeiou";

/// Deterministic stream: FNV-1a seed over the match triple, xorshift64*
/// mixing. No platform randomness anywhere.
struct SeededRng {
    state: u64,
}

impl SeededRng {
    fn from_match(m: &DetectedMatch) -> Self {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

        let mut hash = FNV_OFFSET;
        let mut eat = |bytes: &[u8]| {
            for &b in bytes {
                hash ^= b as u64;
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        };
        eat(m.key.as_bytes());
        eat(&[0]);
        eat(m.value.as_bytes());
        eat(&[0]);
        eat(&(m.index as u64).to_le_bytes());

        Self {
            state: if hash == 0 { FNV_OFFSET } else { hash },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    fn below(&mut self, n: u32) -> u32 {
        (self.next_u64() % n as u64) as u32
    }

    fn digit(&mut self) -> char {
        char::from(b'0' + self.below(10) as u8)
    }

    fn lower(&mut self) -> char {
        char::from(b'a' + self.below(26) as u8)
    }

    fn upper(&mut self) -> char {
        char::from(b'A' + self.below(26) as u8)
    }

    fn consonant(&mut self) -> char {
        char::from(CONSONANTS[self.below(CONSONANTS.len() as u32) as usize])
    }

    fn vowel(&mut self) -> char {
        char::from(VOWELS[self.below(VOWELS.len() as u32) as usize])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Checksum {
    None,
    Luhn,
    Aba,
}

/// How a pattern key gets replaced. Adding a pattern with special handling
/// is one entry in `STRATEGY_TABLE`; everything else takes `Fallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    StructuredDigits(Checksum),
    Sentinel,
    Email,
    Phone,
    DateOfBirth,
    PersonName,
    Fallback,
}

const STRATEGY_TABLE: &[(&str, Strategy)] = &[
    ("ssn", Strategy::StructuredDigits(Checksum::None)),
    ("ssnLabeled", Strategy::StructuredDigits(Checksum::None)),
    ("bankAccount", Strategy::StructuredDigits(Checksum::None)),
    ("creditCard", Strategy::StructuredDigits(Checksum::Luhn)),
    ("routingNumber", Strategy::StructuredDigits(Checksum::Aba)),
    ("cvv", Strategy::Sentinel),
    ("cardExpiry", Strategy::Sentinel),
    ("email", Strategy::Email),
    ("phone", Strategy::Phone),
    ("dateOfBirth", Strategy::DateOfBirth),
    ("fullName", Strategy::PersonName),
];

fn strategy_for(key: &str) -> Strategy {
    STRATEGY_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, s)| *s)
        .unwrap_or(Strategy::Fallback)
}

/// Synthesize a same-length, type-appropriate, checksum-invalid substitute
/// for one detected match.
pub fn generate_safe_replacement(m: &DetectedMatch) -> String {
    let mut rng = SeededRng::from_match(m);
    let candidate = match strategy_for(&m.key) {
        Strategy::StructuredDigits(checksum) => structured_digits(&m.value, checksum, &mut rng),
        Strategy::Sentinel => sentinel(&m.value),
        Strategy::Email => email(&m.value, &mut rng),
        Strategy::Phone => phone(&m.value, &mut rng),
        Strategy::DateOfBirth => date_of_birth(&m.value, &mut rng),
        Strategy::PersonName => person_name(&m.value, &mut rng),
        Strategy::Fallback => char_class_substitute(&m.value, &mut rng),
    };
    enforce_length(candidate, &m.value, &mut rng)
}

/// Regenerate digits in place, keep the punctuation skeleton, and make sure
/// the named checksum does NOT hold on the result.
fn structured_digits(value: &str, checksum: Checksum, rng: &mut SeededRng) -> String {
    let mut out: String = value
        .chars()
        .map(|c| if c.is_ascii_digit() { rng.digit() } else { c })
        .collect();

    let accidentally_valid = match checksum {
        Checksum::Luhn => validators::luhn_valid(&out),
        Checksum::Aba => validators::aba_valid(&out),
        Checksum::None => false,
    };
    if accidentally_valid {
        bump_check_digit(&mut out);
    }
    out
}

/// Flip the rightmost digit by one; a single-digit change always breaks a
/// previously-valid Luhn or ABA checksum.
fn bump_check_digit(value: &mut String) {
    let mut chars: Vec<char> = value.chars().collect();
    if let Some(pos) = chars.iter().rposition(|c| c.is_ascii_digit()) {
        let d = chars[pos].to_digit(10).unwrap_or(0);
        chars[pos] = char::from_digit((d + 1) % 10, 10).unwrap_or('0');
    }
    *value = chars.into_iter().collect();
}

/// CVV and expiry get fixed zero sentinels; there is no safe "plausible but
/// fake" near-future expiry.
fn sentinel(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_digit() { '0' } else { c })
        .collect()
}

/// Token-wise rewrite preserving every `@` and `.` position: each maximal
/// alphabetic run becomes a pronounceable fake of the same length and case
/// pattern, digits are regenerated, everything else is verbatim.
fn email(value: &str, rng: &mut SeededRng) -> String {
    replace_alpha_runs(value, rng)
}

/// Regenerate digit groups inside the original separator pattern, then steer
/// the suffix to the reserved 555-01xx exchange so the output can never be a
/// reachable number.
fn phone(value: &str, rng: &mut SeededRng) -> String {
    let mut chars: Vec<char> = value
        .chars()
        .map(|c| if c.is_ascii_digit() { rng.digit() } else { c })
        .collect();

    let digit_positions: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_ascii_digit())
        .map(|(i, _)| i)
        .collect();

    if digit_positions.len() >= 7 {
        let n = digit_positions.len();
        // exchange 555, line 01xx
        chars[digit_positions[n - 7]] = '5';
        chars[digit_positions[n - 6]] = '5';
        chars[digit_positions[n - 5]] = '5';
        chars[digit_positions[n - 4]] = '0';
        chars[digit_positions[n - 3]] = '1';
    }
    chars.into_iter().collect()
}

/// Regenerate month/day/year groups within the original separators; years
/// are constrained to a plausible historical range.
fn date_of_birth(value: &str, rng: &mut SeededRng) -> String {
    let mut out = String::with_capacity(value.len());
    let mut group = String::new();
    let mut group_index = 0;

    for c in value.chars() {
        if c.is_ascii_digit() {
            group.push(c);
        } else {
            flush_date_group(&mut group, &mut out, &mut group_index, rng);
            out.push(c);
        }
    }
    flush_date_group(&mut group, &mut out, &mut group_index, rng);
    out
}

/// Emit a fake month, day, or year of the same width as the original group.
fn flush_date_group(
    group: &mut String,
    out: &mut String,
    group_index: &mut usize,
    rng: &mut SeededRng,
) {
    if group.is_empty() {
        return;
    }
    let fake = match (*group_index, group.len()) {
        (0, 1) => format!("{}", 1 + rng.below(9)),
        (0, _) => format!("{:02}", 1 + rng.below(12)),
        (1, 1) => format!("{}", 1 + rng.below(9)),
        (1, _) => format!("{:02}", 1 + rng.below(28)),
        (_, 4) => format!("19{:02}", 40 + rng.below(60)),
        (_, n) => (0..n).map(|_| rng.digit()).collect(),
    };
    out.push_str(&fake);
    group.clear();
    *group_index += 1;
}

/// Replace each whitespace-delimited token with a pronounceable string of
/// the same length and capitalization pattern; a two-character
/// initial-plus-period token stays an initial.
fn person_name(value: &str, rng: &mut SeededRng) -> String {
    let mut out = String::with_capacity(value.len());
    for piece in split_keeping_whitespace(value) {
        match piece {
            Piece::Whitespace(ws) => out.push_str(ws),
            Piece::Token(token) => {
                let chars: Vec<char> = token.chars().collect();
                if chars.len() == 2 && chars[1] == '.' && chars[0].is_alphabetic() {
                    out.push(rng.upper());
                    out.push('.');
                } else {
                    out.push_str(&replace_alpha_runs(token, rng));
                }
            }
        }
    }
    out
}

/// Each digit becomes a random digit, each ASCII letter a random letter of
/// the same case; punctuation, whitespace, and non-ASCII are verbatim.
fn char_class_substitute(value: &str, rng: &mut SeededRng) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                rng.digit()
            } else if c.is_ascii_lowercase() {
                rng.lower()
            } else if c.is_ascii_uppercase() {
                rng.upper()
            } else {
                c
            }
        })
        .collect()
}

/// Every candidate leaves through here: truncate or pad so the final output
/// length exactly equals the original, inferring the class of each padding
/// position from the corresponding position in the original value.
fn enforce_length(candidate: String, original: &str, rng: &mut SeededRng) -> String {
    let orig: Vec<char> = original.chars().collect();
    let mut out: Vec<char> = candidate.chars().collect();

    out.truncate(orig.len());
    while out.len() < orig.len() {
        let template = orig[out.len()];
        out.push(if template.is_ascii_digit() {
            rng.digit()
        } else if template.is_ascii_lowercase() {
            rng.lower()
        } else if template.is_ascii_uppercase() {
            rng.upper()
        } else {
            template
        });
    }

    let result: String = out.into_iter().collect();
    if result.len() == original.len() {
        result
    } else {
        // multibyte drift; rebuild strictly class-for-class off the original
        char_class_substitute(original, rng)
    }
}

enum Piece<'a> {
    Token(&'a str),
    Whitespace(&'a str),
}

fn split_keeping_whitespace(value: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_ws = value.starts_with(char::is_whitespace);
    for (i, c) in value.char_indices() {
        if c.is_whitespace() != in_ws {
            if i > start {
                pieces.push(if in_ws {
                    Piece::Whitespace(&value[start..i])
                } else {
                    Piece::Token(&value[start..i])
                });
            }
            start = i;
            in_ws = !in_ws;
        }
    }
    if start < value.len() {
        pieces.push(if in_ws {
            Piece::Whitespace(&value[start..])
        } else {
            Piece::Token(&value[start..])
        });
    }
    pieces
}

/// Rewrite each maximal ASCII-alphabetic run as alternating
/// consonant/vowel, copying the case of each original position; digits are
/// regenerated, everything else passes through.
fn replace_alpha_runs(value: &str, rng: &mut SeededRng) -> String {
    let mut out = String::with_capacity(value.len());
    let mut run_pos = 0;
    for c in value.chars() {
        if c.is_ascii_alphabetic() {
            let base = if run_pos % 2 == 0 {
                rng.consonant()
            } else {
                rng.vowel()
            };
            out.push(if c.is_ascii_uppercase() {
                base.to_ascii_uppercase()
            } else {
                base
            });
            run_pos += 1;
        } else {
            run_pos = 0;
            if c.is_ascii_digit() {
                out.push(rng.digit());
            } else {
                out.push(c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_rules::Severity;

    fn m(key: &str, value: &str, index: usize) -> DetectedMatch {
        DetectedMatch {
            key: key.to_string(),
            label: key.to_string(),
            severity: Severity::High,
            value: value.to_string(),
            index,
            length: value.len(),
        }
    }

    #[test]
    fn test_deterministic() {
        let card = m("creditCard", "4111-1111-1111-1111", 13);
        assert_eq!(
            generate_safe_replacement(&card),
            generate_safe_replacement(&card)
        );
        // a different offset is a different stream
        let moved = m("creditCard", "4111-1111-1111-1111", 14);
        assert_ne!(
            generate_safe_replacement(&card),
            generate_safe_replacement(&moved)
        );
    }

    #[test]
    fn test_length_preserved_across_strategies() {
        for matched in [
            m("ssn", "123-45-6789", 0),
            m("creditCard", "4111 1111 1111 1111", 7),
            m("email", "jane.doe+tag@mail.example.com", 3),
            m("phone", "(555) 123-4567", 21),
            m("dateOfBirth", "3/4/1990", 9),
            m("fullName", "John Q. Public", 2),
            m("mrn", "A12345678", 40),
            m("zipCode", "62704-1234", 11),
        ] {
            let replacement = generate_safe_replacement(&matched);
            assert_eq!(
                replacement.len(),
                matched.length,
                "length drift for {}",
                matched.key
            );
            assert_ne!(replacement, matched.value);
        }
    }

    #[test]
    fn test_luhn_always_invalidated() {
        for (i, value) in [
            "4111-1111-1111-1111",
            "4111111111111111",
            "5500 0055 5555 5559",
            "378282246310005",
        ]
        .iter()
        .enumerate()
        {
            let replacement = generate_safe_replacement(&m("creditCard", value, i * 3));
            assert!(
                !validators::luhn_valid(&replacement),
                "replacement {replacement} passes Luhn"
            );
        }
    }

    #[test]
    fn test_aba_invalidated() {
        let replacement = generate_safe_replacement(&m("routingNumber", "021000021", 0));
        assert!(!validators::aba_valid(&replacement));
        assert!(replacement.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_ssn_keeps_skeleton() {
        let replacement = generate_safe_replacement(&m("ssn", "123-45-6789", 0));
        assert_eq!(replacement.len(), 11);
        assert_eq!(&replacement[3..4], "-");
        assert_eq!(&replacement[6..7], "-");
        assert!(replacement
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(generate_safe_replacement(&m("cvv", "123", 0)), "000");
        assert_eq!(generate_safe_replacement(&m("cardExpiry", "12/26", 0)), "00/00");
    }

    #[test]
    fn test_email_preserves_at_and_dots() {
        let original = "jane.doe@mail.example.com";
        let replacement = generate_safe_replacement(&m("email", original, 0));
        for (i, c) in original.char_indices() {
            if c == '@' || c == '.' {
                assert_eq!(&replacement[i..i + 1], &original[i..i + 1]);
            }
        }
        assert_ne!(replacement, original);
    }

    #[test]
    fn test_phone_steered_to_reserved_range() {
        let replacement = generate_safe_replacement(&m("phone", "(555) 123-4567", 0));
        let digits: String = replacement.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(digits.len(), 10);
        assert_eq!(&digits[3..6], "555");
        assert_eq!(&digits[6..8], "01");
        // separators untouched
        assert_eq!(&replacement[0..1], "(");
        assert_eq!(&replacement[4..6], ") ");
    }

    #[test]
    fn test_dob_plausible_history() {
        let replacement = generate_safe_replacement(&m("dateOfBirth", "03/15/1984", 0));
        let parts: Vec<&str> = replacement.split('/').collect();
        assert_eq!(parts.len(), 3);
        let month: u32 = parts[0].parse().unwrap();
        let day: u32 = parts[1].parse().unwrap();
        let year: u32 = parts[2].parse().unwrap();
        assert!((1..=12).contains(&month));
        assert!((1..=28).contains(&day));
        assert!((1940..=1999).contains(&year));
    }

    #[test]
    fn test_name_tokens_and_initials() {
        let replacement = generate_safe_replacement(&m("fullName", "John Q. Public", 0));
        let tokens: Vec<&str> = replacement.split(' ').collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].len(), 4);
        assert!(tokens[0].chars().next().unwrap().is_ascii_uppercase());
        assert!(tokens[0].chars().skip(1).all(|c| c.is_ascii_lowercase()));
        assert_eq!(tokens[1].len(), 2);
        assert!(tokens[1].ends_with('.'));
        assert!(tokens[1].chars().next().unwrap().is_ascii_uppercase());
        assert_eq!(tokens[2].len(), 6);
    }

    #[test]
    fn test_fallback_preserves_classes() {
        let original = "AB-12cd_3 x";
        let replacement = generate_safe_replacement(&m("insuranceId", original, 0));
        for (o, r) in original.chars().zip(replacement.chars()) {
            assert_eq!(o.is_ascii_digit(), r.is_ascii_digit());
            assert_eq!(o.is_ascii_lowercase(), r.is_ascii_lowercase());
            assert_eq!(o.is_ascii_uppercase(), r.is_ascii_uppercase());
            if !o.is_ascii_alphanumeric() {
                assert_eq!(o, r);
            }
        }
    }
}
