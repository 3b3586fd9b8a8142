use super::rules::RuleError;
use super::state::{Card, CardId, Hand, Player};

/// 决定某个座位出哪张牌。只做选择，不改手牌。
pub trait MoveSelector {
    fn select_card(&mut self, hand: &Hand) -> Result<Card, RuleError>;
}

/// 界面上玩家点选的牌。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChosenCard {
    card_id: CardId,
}

impl ChosenCard {
    pub fn new(card_id: CardId) -> Self {
        Self { card_id }
    }
}

impl MoveSelector for ChosenCard {
    fn select_card(&mut self, hand: &Hand) -> Result<Card, RuleError> {
        hand.get(self.card_id)
            .cloned()
            .ok_or(RuleError::CardNotInHand {
                card_id: self.card_id,
            })
    }
}

impl Player {
    /// 选牌并立即打出。
    pub fn play_with<S: MoveSelector + ?Sized>(
        &mut self,
        selector: &mut S,
    ) -> Result<Card, RuleError> {
        let card = selector.select_card(&self.hand)?;
        self.play_card(card.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::moves::Move;

    #[test]
    fn chosen_card_returns_matching_card() {
        let mut player = Player::new(0, 0);
        player.make_hand().expect("fresh ids");
        let paper = player.hand.cards()[1].clone();
        let mut chosen = ChosenCard::new(paper.id());
        assert_eq!(chosen.select_card(&player.hand), Ok(paper.clone()));
        assert_eq!(player.hand.len(), 3, "selection must not mutate the hand");

        let played = player.play_with(&mut chosen).expect("paper is in hand");
        assert_eq!(played.mv(), Move::Paper);
        assert_eq!(player.hand.len(), 2);
    }

    #[test]
    fn chosen_card_absent_is_reported() {
        let mut player = Player::new(0, 0);
        player.make_hand().expect("fresh ids");
        let err = player.play_with(&mut ChosenCard::new(42)).unwrap_err();
        assert_eq!(err, RuleError::CardNotInHand { card_id: 42 });
        assert_eq!(player.hand.len(), 3);
    }
}
