pub mod chapa;
