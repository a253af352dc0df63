//! Check-digit validation for CPF identifiers
//!
//! Pure functions only: no I/O, no allocation beyond the digit buffer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of digits in a CPF
pub const CPF_LEN: usize = 11;

/// Shortest input a fiscal region is derived from
const MIN_REGION_DIGITS: usize = 10;

/// Extract the decimal digits from free-form input, ignoring everything else
pub fn digits_of(input: &str) -> Vec<u8> {
    input
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .collect()
}

/// Digits as a plain string (`"123.456.789-09"` -> `"12345678909"`)
pub fn clean_cpf(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Validate a CPF against the two-pass mod-11 check-digit algorithm.
///
/// Input must hold exactly 11 digits once non-digits are stripped. Strings
/// where every digit is the same are rejected even though they satisfy the
/// arithmetic.
pub fn is_valid_cpf(input: &str) -> bool {
    let digits = digits_of(input);
    if digits.len() != CPF_LEN {
        return false;
    }
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Weights run from `len + 1` down to 2; a remainder of 10 maps to 0.
fn check_digit(digits: &[u8]) -> u8 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * (top - i as u32))
        .sum();

    match (sum * 10) % 11 {
        10 => 0,
        rest => rest as u8,
    }
}

/// Render 11 digits as `000.000.000-00`; anything else is returned as bare digits
pub fn format_cpf(input: &str) -> String {
    let digits = clean_cpf(input);
    if digits.len() != CPF_LEN {
        return digits;
    }
    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}

/// Mask a CPF for log output, keeping only the first three digits
pub fn mask_cpf(input: &str) -> String {
    let digits = clean_cpf(input);
    let head: String = digits.chars().take(3).collect();
    format!("{head}***")
}

/// Advisory geographic grouping derived from the 9th CPF digit.
///
/// This is metadata for operators, never a validity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiscalRegion {
    RioGrandeDoSul,
    CentroOeste,
    Norte,
    CearaMaranhaoPiaui,
    NordesteOriental,
    BahiaSergipe,
    MinasGerais,
    EspiritoSantoRioDeJaneiro,
    SaoPaulo,
    ParanaSantaCatarina,
    Unknown,
}

impl FiscalRegion {
    const TABLE: [FiscalRegion; 10] = [
        FiscalRegion::RioGrandeDoSul,
        FiscalRegion::CentroOeste,
        FiscalRegion::Norte,
        FiscalRegion::CearaMaranhaoPiaui,
        FiscalRegion::NordesteOriental,
        FiscalRegion::BahiaSergipe,
        FiscalRegion::MinasGerais,
        FiscalRegion::EspiritoSantoRioDeJaneiro,
        FiscalRegion::SaoPaulo,
        FiscalRegion::ParanaSantaCatarina,
    ];

    /// Look up the region for a CPF from its 9th digit; inputs with fewer
    /// than 10 digits are `Unknown`
    pub fn of(input: &str) -> Self {
        let digits = digits_of(input);
        if digits.len() < MIN_REGION_DIGITS {
            return FiscalRegion::Unknown;
        }
        Self::TABLE[digits[8] as usize]
    }

    /// State abbreviations covered by the region
    pub fn states(&self) -> &'static str {
        match self {
            FiscalRegion::RioGrandeDoSul => "RS",
            FiscalRegion::CentroOeste => "DF, GO, MS, MT, TO",
            FiscalRegion::Norte => "AC, AM, AP, PA, RO, RR",
            FiscalRegion::CearaMaranhaoPiaui => "CE, MA, PI",
            FiscalRegion::NordesteOriental => "AL, PB, PE, RN",
            FiscalRegion::BahiaSergipe => "BA, SE",
            FiscalRegion::MinasGerais => "MG",
            FiscalRegion::EspiritoSantoRioDeJaneiro => "ES, RJ",
            FiscalRegion::SaoPaulo => "SP",
            FiscalRegion::ParanaSantaCatarina => "PR, SC",
            FiscalRegion::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FiscalRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.states())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "52998224725";

    #[test]
    fn test_known_valid_cpfs() {
        assert!(is_valid_cpf(VALID));
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("123.456.789-09"));
        assert!(is_valid_cpf("11144477735"));
    }

    #[test]
    fn test_repeated_digits_always_invalid() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(CPF_LEN);
            assert!(!is_valid_cpf(&cpf), "{cpf} should be rejected");
        }
    }

    #[test]
    fn test_wrong_length_invalid() {
        assert!(!is_valid_cpf(""));
        assert!(!is_valid_cpf("5299822472"));
        assert!(!is_valid_cpf("529982247250"));
        assert!(!is_valid_cpf("abc.def.ghi-jk"));
    }

    #[test]
    fn test_flipped_body_digit_invalidates() {
        // Changing any of the first nine digits must break at least one check digit
        let original = digits_of(VALID);
        for pos in 0..9 {
            let mut mutated = original.clone();
            mutated[pos] = (mutated[pos] + 1) % 10;
            let s: String = mutated.iter().map(|d| d.to_string()).collect();
            assert!(!is_valid_cpf(&s), "mutation at {pos} produced {s}");
        }
    }

    #[test]
    fn test_wrong_check_digits() {
        assert!(!is_valid_cpf("52998224715"));
        assert!(!is_valid_cpf("52998224726"));
        assert!(!is_valid_cpf("123.456.789-00"));
    }

    #[test]
    fn test_check_digit_maps_ten_to_zero() {
        // 123456789 -> first check digit 0 because (210 * 10) % 11 == 10
        assert_eq!(check_digit(&[1, 2, 3, 4, 5, 6, 7, 8, 9]), 0);
    }

    #[test]
    fn test_validation_is_deterministic() {
        for _ in 0..3 {
            assert!(is_valid_cpf(VALID));
            assert!(!is_valid_cpf("52998224724"));
        }
    }

    #[test]
    fn test_format_and_mask() {
        assert_eq!(format_cpf("52998224725"), "529.982.247-25");
        assert_eq!(format_cpf("529.982.247-25"), "529.982.247-25");
        assert_eq!(format_cpf("1234"), "1234");
        assert_eq!(mask_cpf("529.982.247-25"), "529***");
    }

    #[test]
    fn test_fiscal_region_lookup() {
        assert_eq!(
            FiscalRegion::of("529.982.247-25"),
            FiscalRegion::EspiritoSantoRioDeJaneiro
        );
        assert_eq!(
            FiscalRegion::of("123.456.789-09"),
            FiscalRegion::ParanaSantaCatarina
        );
        assert_eq!(FiscalRegion::of("0000000000"), FiscalRegion::RioGrandeDoSul);
        assert_eq!(FiscalRegion::of("000000000"), FiscalRegion::Unknown);
        assert_eq!(FiscalRegion::of("12345678"), FiscalRegion::Unknown);
        assert_eq!(FiscalRegion::of(""), FiscalRegion::Unknown);
        assert_eq!(FiscalRegion::SaoPaulo.to_string(), "SP");
        assert_eq!(FiscalRegion::Unknown.to_string(), "Unknown");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn with_check_digits(base: &[u8]) -> String {
        let mut digits = base.to_vec();
        digits.push(check_digit(&digits));
        digits.push(check_digit(&digits));
        digits.iter().map(|d| char::from(b'0' + d)).collect()
    }

    fn base_digits() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(0u8..10, 9).prop_filter("not all equal", |d| d.iter().any(|&x| x != d[0]))
    }

    proptest! {
        #[test]
        fn prop_generated_check_digits_validate(base in base_digits()) {
            let cpf = with_check_digits(&base);
            prop_assert!(is_valid_cpf(&cpf));
            prop_assert!(is_valid_cpf(&format_cpf(&cpf)));
        }

        #[test]
        fn prop_wrong_last_digit_fails(base in base_digits(), delta in 1u8..10) {
            let cpf = with_check_digits(&base);
            let mut bytes = cpf.into_bytes();
            bytes[10] = b'0' + (bytes[10] - b'0' + delta) % 10;
            let tampered = String::from_utf8(bytes).unwrap();
            prop_assert!(!is_valid_cpf(&tampered));
        }

        #[test]
        fn prop_validation_never_panics(input in ".{0,40}") {
            let _ = is_valid_cpf(&input);
            let _ = FiscalRegion::of(&input);
        }
    }
}
