//! App - アプリケーション層
//!
//! このモジュールは、ports と workflows を組み合わせて呼び出し側を実装します。
//!
//! # 主要コンポーネント
//! - **ConsoleBuilder**: Console の構築とワイヤリング
//! - **Console**: アプリ単位の直列化と、workflow 出力のキャッシュ反映

pub mod builder;
pub mod console;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, ConsoleBuilder};
pub use self::console::{Console, ConsoleError};
