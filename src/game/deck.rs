use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::rules::EngineError;

/// 默认的水果符号表。
pub const DEFAULT_SYMBOLS: [&str; 12] = [
    "🍎", "🍌", "🍇", "🍊", "🍓", "🍉", "🍒", "🍐", "🥝", "🍑", "🥥", "🍋",
];

/// 卡牌可见状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Hidden,
    Revealed,
    Matched,
}

impl Default for CardStatus {
    fn default() -> Self {
        CardStatus::Hidden
    }
}

/// 棋盘上的一张牌，`index` 即其在牌组中的固定位置。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub index: usize,
    pub symbol: String,
    #[serde(default)]
    pub status: CardStatus,
}

impl Card {
    pub fn new(index: usize, symbol: impl Into<String>) -> Self {
        Self {
            index,
            symbol: symbol.into(),
            status: CardStatus::Hidden,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.status == CardStatus::Matched
    }

    pub fn is_hidden(&self) -> bool {
        self.status == CardStatus::Hidden
    }
}

/// 一局的牌组，每个符号恰好出现两次。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn from_symbols<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Self {
        let cards = symbols
            .into_iter()
            .enumerate()
            .map(|(index, symbol)| Card::new(index, symbol))
            .collect();
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.cards.len() / 2
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Card> {
        self.cards.get_mut(index)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|card| card.symbol.as_str())
    }
}

/// Fisher-Yates 洗牌。
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// 取符号表前 `pair_count` 个符号，各放两张后洗牌。
pub fn build_deck<S, R>(pair_count: u32, alphabet: &[S], rng: &mut R) -> Result<Deck, EngineError>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    if pair_count == 0 {
        return Err(EngineError::invalid_configuration(
            "pair count must be greater than zero",
        ));
    }
    let pairs = pair_count as usize;
    if pairs > alphabet.len() {
        return Err(EngineError::invalid_configuration(format!(
            "pair count {pair_count} exceeds alphabet of {} symbols",
            alphabet.len()
        )));
    }

    let chosen = &alphabet[..pairs];
    let mut seen = HashSet::with_capacity(pairs);
    for symbol in chosen {
        if !seen.insert(symbol.as_ref()) {
            return Err(EngineError::invalid_configuration(format!(
                "symbol {} appears more than once in the alphabet",
                symbol.as_ref()
            )));
        }
    }

    let mut symbols: Vec<&str> = chosen
        .iter()
        .flat_map(|symbol| [symbol.as_ref(), symbol.as_ref()])
        .collect();
    shuffle(&mut symbols, rng);

    Ok(Deck::from_symbols(symbols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn symbol_counts(deck: &Deck) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for symbol in deck.symbols() {
            *counts.entry(symbol).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn every_symbol_appears_exactly_twice() {
        let mut rng = SmallRng::seed_from_u64(7);
        for pair_count in 1..=DEFAULT_SYMBOLS.len() as u32 {
            let deck = build_deck(pair_count, &DEFAULT_SYMBOLS, &mut rng)
                .expect("deck should build");
            assert_eq!(deck.len(), 2 * pair_count as usize);

            let counts = symbol_counts(&deck);
            assert_eq!(counts.len(), pair_count as usize);
            assert!(counts.values().all(|&count| count == 2));
            for symbol in &DEFAULT_SYMBOLS[..pair_count as usize] {
                assert_eq!(counts.get(symbol), Some(&2));
            }
        }
    }

    #[test]
    fn cards_start_hidden_with_positional_indices() {
        let mut rng = SmallRng::seed_from_u64(1);
        let deck = build_deck(4, &["A", "B", "C", "D"], &mut rng).expect("deck should build");
        for (position, card) in deck.cards().iter().enumerate() {
            assert_eq!(card.index, position);
            assert!(card.is_hidden());
        }
    }

    #[test]
    fn zero_pairs_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = build_deck(0, &["A", "B"], &mut rng);
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn too_many_pairs_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = build_deck(3, &["A", "B"], &mut rng);
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = build_deck(2, &["A", "A", "B"], &mut rng);
        assert!(matches!(
            result,
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let first = build_deck(6, &DEFAULT_SYMBOLS, &mut SmallRng::seed_from_u64(99))
            .expect("deck should build");
        let second = build_deck(6, &DEFAULT_SYMBOLS, &mut SmallRng::seed_from_u64(99))
            .expect("deck should build");
        assert_eq!(first, second);
    }

    #[test]
    fn shuffle_places_pairs_uniformly() {
        // 3 pairs -> 6 positions -> 15 unordered position pairs for symbol "A".
        const TRIALS: usize = 30_000;
        let mut rng = SmallRng::seed_from_u64(2024);
        let mut hits: HashMap<(usize, usize), usize> = HashMap::new();

        for _ in 0..TRIALS {
            let deck = build_deck(3, &["A", "B", "C"], &mut rng).expect("deck should build");
            let positions: Vec<usize> = deck
                .cards()
                .iter()
                .filter(|card| card.symbol == "A")
                .map(|card| card.index)
                .collect();
            *hits.entry((positions[0], positions[1])).or_insert(0) += 1;
        }

        assert_eq!(hits.len(), 15, "every position pair should occur");
        let expected = TRIALS as f64 / 15.0;
        let chi_square: f64 = hits
            .values()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum();
        // 14 degrees of freedom; 36.12 is the 0.001 critical value.
        assert!(chi_square < 36.12, "chi-square too large: {chi_square}");
    }

    #[test]
    fn shuffle_keeps_every_element() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }
}
