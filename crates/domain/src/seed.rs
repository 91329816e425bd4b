//! Built-in automations installed by the seed operation.
//!
//! Seeded automations are flagged `is_system` and matched by name, so seeding
//! twice never creates duplicates.

use crate::automation::{Automation, EmailTemplate, SequenceStep, Trigger};
use crate::error::MailflowError;
use crate::time::Timestamp;

pub const WELCOME: &str = "Welcome email";
pub const PURCHASE_THANK_YOU: &str = "Purchase thank-you";
pub const ORDER_FULFILLED: &str = "Order fulfilled";
pub const CART_RECOVERY: &str = "Abandoned cart recovery";

/// Build the default catalogue with timestamps set to `now`.
///
/// # Errors
///
/// Returns [`MailflowError::Validation`] if a catalogue entry is malformed.
pub fn default_automations(now: Timestamp) -> Result<Vec<Automation>, MailflowError> {
    Ok(vec![
        Automation::builder()
            .name(WELCOME)
            .description("Greets new subscribers right after signup")
            .trigger(Trigger::Signup)
            .system(true)
            .one_time_per_recipient(true)
            .template(EmailTemplate {
                subject: "Welcome, {{customer_first_name}}!".to_string(),
                body_text: "Hi {{customer_first_name}},\n\nThanks for joining us. \
                            We'll keep you posted on new arrivals and offers."
                    .to_string(),
                cta_label: Some("Start shopping".to_string()),
                cta_url: Some("{{shop_url}}".to_string()),
                footer_text: Some("You received this email because you signed up.".to_string()),
                ..EmailTemplate::default()
            })
            .created_at(now)
            .build()?,
        Automation::builder()
            .name(PURCHASE_THANK_YOU)
            .description("Thanks the customer once an order is placed")
            .trigger(Trigger::Purchase)
            .system(true)
            .template(EmailTemplate {
                subject: "Thank you for your order {{order_id}}".to_string(),
                body_text: "Hi {{customer_first_name}},\n\nWe received your order \
                            {{order_id}} for {{product_name}} ({{qty}} x {{price}})."
                    .to_string(),
                ..EmailTemplate::default()
            })
            .created_at(now)
            .build()?,
        Automation::builder()
            .name(ORDER_FULFILLED)
            .description("Lets the customer know the order has shipped")
            .trigger(Trigger::OrderFulfilled)
            .system(true)
            .template(EmailTemplate {
                subject: "Your order {{order_id}} is on its way".to_string(),
                body_text: "Hi {{customer_first_name}},\n\nGood news: order {{order_id}} \
                            has been fulfilled and is on its way to you."
                    .to_string(),
                ..EmailTemplate::default()
            })
            .created_at(now)
            .build()?,
        Automation::builder()
            .name(CART_RECOVERY)
            .description("Three reminders for carts left behind")
            .trigger(Trigger::CartAbandoned)
            .system(true)
            .steps(vec![
                cart_step(
                    1,
                    0,
                    "You left something behind",
                    "Hi {{customer_first_name}}, your {{product_name}} is still in your cart: \
                     {{cart_recovery_url}}",
                ),
                cart_step(
                    2,
                    1,
                    "Still thinking about {{product_name}}?",
                    "Your cart is saved and waiting for you: {{cart_recovery_url}}",
                ),
                cart_step(
                    3,
                    3,
                    "Last chance for your cart",
                    "We can only hold your {{product_name}} ({{size}}, {{color}}) a little \
                     longer: {{cart_recovery_url}}",
                ),
            ])
            .created_at(now)
            .build()?,
    ])
}

fn cart_step(order: u32, delay_days: u32, subject: &str, body: &str) -> SequenceStep {
    SequenceStep {
        order,
        delay_days,
        delay_hours: 0,
        subject: subject.to_string(),
        body: body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::AutomationContent;
    use crate::time::now;
    use chrono::Duration;

    #[test]
    fn should_build_valid_system_automations() {
        let autos = default_automations(now()).unwrap();
        assert_eq!(autos.len(), 4);
        assert!(autos.iter().all(|a| a.is_system && a.is_accepting()));
        for a in &autos {
            a.validate().unwrap();
        }
    }

    #[test]
    fn should_cover_every_event_trigger() {
        let autos = default_automations(now()).unwrap();
        let triggers: Vec<Trigger> = autos.iter().map(|a| a.trigger).collect();
        assert!(triggers.contains(&Trigger::Signup));
        assert!(triggers.contains(&Trigger::Purchase));
        assert!(triggers.contains(&Trigger::OrderFulfilled));
        assert!(triggers.contains(&Trigger::CartAbandoned));
    }

    #[test]
    fn should_schedule_cart_recovery_at_zero_one_and_three_days() {
        let autos = default_automations(now()).unwrap();
        let cart = autos.iter().find(|a| a.name == CART_RECOVERY).unwrap();
        let AutomationContent::Sequence { steps } = &cart.content else {
            panic!("expected a sequence");
        };
        let delays: Vec<Duration> = steps.iter().map(SequenceStep::delay).collect();
        assert_eq!(
            delays,
            vec![Duration::zero(), Duration::days(1), Duration::days(3)]
        );
    }
}
