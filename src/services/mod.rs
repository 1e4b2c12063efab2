pub mod cart_service;
pub mod checkout_service;
pub mod notification;
pub mod order_number;
pub mod order_service;
pub mod stock_validator;
