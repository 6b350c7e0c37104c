/// A type representing a card, defined as an alias of `u8`.
///
/// The correspondence between the card and its ID is defined as follows:
/// - `card_id = 4 * rank + suit` (where `0 <= card_id < 52`)
///   - `rank`: 2 => `0`, 3 => `1`, 4 => `2`, ..., A => `12`
///   - `suit`: club => `0`, diamond => `1`, heart => `2`, spade => `3`
///
/// An undealt card is represented by `NOT_DEALT`.
pub type Card = u8;

/// Constant representing that the card is not yet dealt.
pub const NOT_DEALT: Card = Card::MAX;

#[inline]
pub(crate) fn check_card(card: Card) -> Result<(), String> {
    if card < 52 {
        Ok(())
    } else {
        Err(format!("Invalid card: {card}"))
    }
}

/// Attempts to convert a rank index to a rank character.
///
/// `12` => `'A'`, `11` => `'K'`, ..., `0` => `'2'`.
#[inline]
pub fn rank_to_char(rank: u8) -> Result<char, String> {
    match rank {
        12 => Ok('A'),
        11 => Ok('K'),
        10 => Ok('Q'),
        9 => Ok('J'),
        8 => Ok('T'),
        0..=7 => Ok((rank + b'2') as char),
        _ => Err(format!("Invalid input: {rank}")),
    }
}

/// Attempts to convert a suit index to a suit character.
///
/// `0` => `'c'`, `1` => `'d'`, `2` => `'h'`, `3` => `'s'`.
#[inline]
pub fn suit_to_char(suit: u8) -> Result<char, String> {
    match suit {
        0 => Ok('c'),
        1 => Ok('d'),
        2 => Ok('h'),
        3 => Ok('s'),
        _ => Err(format!("Invalid input: {suit}")),
    }
}

/// Attempts to convert a card into its two-character string form, e.g. `"Ah"`.
///
/// # Examples
/// ```
/// use lookahead_resolver::card_to_string;
///
/// assert_eq!(card_to_string(0), Ok("2c".to_string()));
/// assert_eq!(card_to_string(5), Ok("3d".to_string()));
/// assert_eq!(card_to_string(10), Ok("4h".to_string()));
/// assert_eq!(card_to_string(51), Ok("As".to_string()));
/// assert!(card_to_string(52).is_err());
/// ```
#[inline]
pub fn card_to_string(card: Card) -> Result<String, String> {
    check_card(card)?;
    let rank = card >> 2;
    let suit = card & 3;
    Ok(format!("{}{}", rank_to_char(rank)?, suit_to_char(suit)?))
}

/// Returns the rank of a card (`0..=12`).
#[inline]
pub fn card_rank(card: Card) -> u8 {
    card >> 2
}

/// Returns the suit of a card (`0..=3`).
#[inline]
pub fn card_suit(card: Card) -> u8 {
    card & 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_to_string() {
        assert_eq!(card_to_string(0).unwrap(), "2c");
        assert_eq!(card_to_string(51).unwrap(), "As");
        assert!(card_to_string(52).is_err());
    }

    #[test]
    fn test_rank_suit_roundtrip() {
        for card in 0..52u8 {
            assert_eq!(card_rank(card) * 4 + card_suit(card), card);
        }
    }
}
