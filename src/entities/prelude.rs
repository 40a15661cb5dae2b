pub use super::investment_tickets::Entity as InvestmentTickets;
