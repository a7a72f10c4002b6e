use super::{RoomType, Style};

fn room_base_price(room_type: RoomType) -> i64 {
    match room_type {
        RoomType::LivingRoom => 35_000,
        RoomType::Bedroom => 28_000,
        RoomType::Kitchen => 45_000,
        RoomType::Bathroom => 25_000,
        RoomType::DiningRoom => 32_000,
        RoomType::Office => 30_000,
    }
}

// Percent, so the product stays integral for every catalog base price.
fn style_multiplier_pct(style: Style) -> i64 {
    match style {
        Style::Modern => 120,
        Style::Minimalist => 100,
        Style::Traditional => 110,
        Style::Industrial => 130,
        Style::Scandinavian => 120,
        Style::Contemporary => 140,
    }
}

/// Estimated price, in whole currency units, stored on AI-generated designs.
pub fn estimate_price(style: Style, room_type: RoomType) -> i64 {
    (room_base_price(room_type) * style_multiplier_pct(style) + 50) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_applies_style_multiplier_to_room_base() {
        assert_eq!(estimate_price(Style::Modern, RoomType::LivingRoom), 42_000);
        assert_eq!(estimate_price(Style::Minimalist, RoomType::Bathroom), 25_000);
        assert_eq!(estimate_price(Style::Contemporary, RoomType::Kitchen), 63_000);
        assert_eq!(estimate_price(Style::Traditional, RoomType::Office), 33_000);
    }
}
