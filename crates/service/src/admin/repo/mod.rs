pub mod seaorm;

pub use seaorm::SeaOrmLoginAttemptRepository;
